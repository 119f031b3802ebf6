// money.rs
// Item subtotal and sale total arithmetic. Pure; every save path goes
// through here so derived amounts are never trusted from input.

use crate::models::LineItem;

/// Recomputes each line's subtotal in place and returns the gross total.
pub fn recompute_items(items: &mut [LineItem]) -> f64 {
    let mut gross = 0.0;
    for item in items.iter_mut() {
        item.subtotal = item.quantity as f64 * item.price_per_item;
        gross += item.subtotal;
    }
    gross
}

/// Remaining balance of a credit record; never negative.
pub fn remaining(total_amount: f64, paid_amount: f64) -> f64 {
    (total_amount - paid_amount).max(0.0)
}

/// Discounted sale total and change due back to the customer.
pub fn sale_totals(gross: f64, discount: f64, amount_received: f64) -> (f64, f64) {
    let total = (gross - discount).max(0.0);
    let change = (amount_received - total).max(0.0);
    (total, change)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: i64, price: f64) -> LineItem {
        LineItem {
            item_name: "Sugar".into(),
            quantity,
            price_per_item: price,
            subtotal: 0.0,
        }
    }

    #[test]
    fn recompute_overwrites_stale_subtotals() {
        let mut items = vec![
            LineItem {
                subtotal: 999.0,
                ..item(2, 150.0)
            },
            item(3, 40.0),
        ];
        let gross = recompute_items(&mut items);
        assert_eq!(items[0].subtotal, 300.0);
        assert_eq!(items[1].subtotal, 120.0);
        assert_eq!(gross, 420.0);
    }

    #[test]
    fn remaining_clamps_at_zero() {
        assert_eq!(remaining(300.0, 100.0), 200.0);
        assert_eq!(remaining(300.0, 300.0), 0.0);
        assert_eq!(remaining(300.0, 400.0), 0.0);
    }

    #[test]
    fn sale_totals_apply_discount_and_change() {
        let (total, change) = sale_totals(1000.0, 100.0, 950.0);
        assert_eq!(total, 900.0);
        assert_eq!(change, 50.0);
    }

    #[test]
    fn oversized_discount_floors_total_at_zero() {
        let (total, change) = sale_totals(100.0, 500.0, 20.0);
        assert_eq!(total, 0.0);
        assert_eq!(change, 20.0);
    }
}
