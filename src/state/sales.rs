// Sales: immediate, fully settled transactions with per-owner-per-day
// sequential receipt numbers.

use bson::{DateTime, doc, oid::ObjectId, to_bson};
use chrono::{Datelike, NaiveDate, Utc};
use futures::stream::TryStreamExt;
use mongodb::options::ReturnDocument;
use std::time::SystemTime;

use crate::error::ApiError;
use crate::models::{LineItem, PaymentMethod, Sale};
use crate::money::{recompute_items, sale_totals};

use super::AppState;
use super::udhar::{created_range_filter, validate_items};

fn now() -> DateTime {
    DateTime::from_system_time(SystemTime::now())
}

/// Allocates the next receipt number for the owner's current day with an
/// atomic upserted `$inc`, so concurrent sales never share a number.
/// Format: REC-YYYYMMDD-NNNNN.
pub async fn next_receipt_number(state: &AppState, owner: &ObjectId) -> Result<String, ApiError> {
    let today = Utc::now().date_naive();
    let day = format!("{:04}{:02}{:02}", today.year(), today.month(), today.day());

    let counter = state
        .receipt_counters
        .find_one_and_update(
            doc! { "owner": owner, "day": &day },
            doc! { "$inc": { "seq": 1 } },
        )
        .upsert(true)
        .return_document(ReturnDocument::After)
        .await?
        .ok_or_else(|| {
            ApiError::Validation("receipt counter upsert returned no document".into())
        })?;

    Ok(format!("REC-{day}-{:05}", counter.seq))
}

fn validate_sale_amounts(amount_received: f64, discount: f64) -> Result<(), ApiError> {
    if !amount_received.is_finite() || amount_received < 0.0 {
        return Err(ApiError::Validation(
            "Amount received cannot be negative".into(),
        ));
    }
    if !discount.is_finite() || discount < 0.0 {
        return Err(ApiError::Validation("Discount cannot be negative".into()));
    }
    Ok(())
}

pub async fn create_sale(
    state: &AppState,
    owner: &ObjectId,
    customer: Option<ObjectId>,
    walk_in_name: Option<String>,
    mut items: Vec<LineItem>,
    amount_received: f64,
    discount: f64,
    payment_method: PaymentMethod,
    notes: Option<String>,
) -> Result<Sale, ApiError> {
    validate_items(&items)?;
    validate_sale_amounts(amount_received, discount)?;

    let gross = recompute_items(&mut items);
    let (total_amount, change_returned) = sale_totals(gross, discount, amount_received);
    let receipt_number = next_receipt_number(state, owner).await?;

    let mut sale = Sale {
        id: None,
        customer,
        walk_in_name: walk_in_name.unwrap_or_default().trim().to_string(),
        items,
        total_amount,
        amount_received,
        change_returned,
        payment_method,
        discount,
        notes: notes.unwrap_or_default(),
        receipt_number,
        created_by: owner.clone(),
        created_at: Some(now()),
        updated_at: None,
    };

    let res = state.sales.insert_one(sale.clone()).await?;
    sale.id = res.inserted_id.as_object_id();
    Ok(sale)
}

pub async fn get_sale(state: &AppState, id: &ObjectId, owner: &ObjectId) -> Result<Sale, ApiError> {
    state
        .sales
        .find_one(doc! { "_id": id, "createdBy": owner })
        .await?
        .ok_or(ApiError::NotFound("Sale"))
}

#[derive(Debug, Default, Clone)]
pub struct SaleListFilter {
    pub customer: Option<ObjectId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: u64,
    pub limit: u64,
}

pub async fn list_sales(
    state: &AppState,
    owner: &ObjectId,
    filter: &SaleListFilter,
) -> Result<(Vec<Sale>, u64), ApiError> {
    let mut query = doc! { "createdBy": owner };
    if let Some(customer) = &filter.customer {
        query.insert("customer", customer);
    }
    if let Some(range) = created_range_filter(filter.start_date, filter.end_date) {
        query.insert("createdAt", range);
    }

    let total = state.sales.count_documents(query.clone()).await?;

    let page = filter.page.max(1);
    let limit = filter.limit.max(1);
    let mut cursor = state
        .sales
        .find(query)
        .sort(doc! { "createdAt": -1 })
        .skip((page - 1) * limit)
        .limit(limit as i64)
        .await?;

    let mut sales = Vec::new();
    while let Some(sale) = cursor.try_next().await? {
        sales.push(sale);
    }
    Ok((sales, total))
}

/// Explicit edit of a sale. Totals and change are re-derived from the
/// patched fields; the receipt number never changes.
pub async fn update_sale(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
    customer: Option<Option<ObjectId>>,
    walk_in_name: Option<String>,
    items: Option<Vec<LineItem>>,
    amount_received: Option<f64>,
    discount: Option<f64>,
    payment_method: Option<PaymentMethod>,
    notes: Option<String>,
) -> Result<Sale, ApiError> {
    let existing = get_sale(state, id, owner).await?;

    let mut items = items.unwrap_or(existing.items);
    validate_items(&items)?;
    let amount_received = amount_received.unwrap_or(existing.amount_received);
    let discount = discount.unwrap_or(existing.discount);
    validate_sale_amounts(amount_received, discount)?;

    let gross = recompute_items(&mut items);
    let (total_amount, change_returned) = sale_totals(gross, discount, amount_received);

    let mut set = doc! {
        "items": to_bson(&items).map_err(|e| ApiError::Validation(e.to_string()))?,
        "totalAmount": total_amount,
        "amountReceived": amount_received,
        "changeReturned": change_returned,
        "discount": discount,
        "updatedAt": now(),
    };
    if let Some(customer) = customer {
        set.insert("customer", customer);
    }
    if let Some(walk_in_name) = walk_in_name {
        set.insert("walkInName", walk_in_name.trim());
    }
    if let Some(payment_method) = payment_method {
        set.insert("paymentMethod", payment_method.as_str());
    }
    if let Some(notes) = notes {
        set.insert("notes", notes);
    }

    state
        .sales
        .update_one(doc! { "_id": id, "createdBy": owner }, doc! { "$set": set })
        .await?;

    get_sale(state, id, owner).await
}

pub async fn delete_sale(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
) -> Result<(), ApiError> {
    let res = state
        .sales
        .delete_one(doc! { "_id": id, "createdBy": owner })
        .await?;
    if res.deleted_count == 0 {
        return Err(ApiError::NotFound("Sale"));
    }
    Ok(())
}
