// Dashboard aggregation: per-status buckets across both ledgers, the
// due-today count, and a merged recent-activity feed. Read-only projection.
//
// Buckets group by the resolver-derived effective status, not the raw
// stored field, so the dashboard always agrees with the list views.

use bson::{DateTime, doc, oid::ObjectId};
use futures::stream::TryStreamExt;
use serde::Serialize;

use crate::error::ApiError;
use crate::models::{BorrowStatus, UdharStatus};
use crate::status::{effective_borrow_status, effective_udhar_status, today};

use super::AppState;
use super::customers::{count_customers, customer_ref_map};

#[derive(Debug, Default, Clone, Copy, Serialize)]
pub struct StatusBucket {
    pub count: u64,
    pub total: f64,
}

impl StatusBucket {
    fn add(&mut self, amount: f64) {
        self.count += 1;
        self.total += amount;
    }
}

#[derive(Debug, Default, Serialize)]
pub struct UdharStats {
    #[serde(rename = "Pending")]
    pub pending: StatusBucket,
    #[serde(rename = "PartialPaid")]
    pub partial_paid: StatusBucket,
    #[serde(rename = "Paid")]
    pub paid: StatusBucket,
    #[serde(rename = "Overdue")]
    pub overdue: StatusBucket,
}

#[derive(Debug, Default, Serialize)]
pub struct BorrowStats {
    #[serde(rename = "Pending")]
    pub pending: StatusBucket,
    #[serde(rename = "Paid")]
    pub paid: StatusBucket,
    #[serde(rename = "Overdue")]
    pub overdue: StatusBucket,
}

/// One row of the recent-activity feed, merged from both ledgers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub name: String,
    pub phone: String,
    pub amount: f64,
    pub status: &'static str,
    pub due_date: DateTime,
    pub created_at: Option<DateTime>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_customers: u64,
    pub customer_udhar: UdharStats,
    pub shop_borrow: BorrowStats,
    pub due_today: u64,
    pub recent_transactions: Vec<ActivityItem>,
}

pub async fn dashboard_stats(
    state: &AppState,
    owner: &ObjectId,
) -> Result<DashboardStats, ApiError> {
    let as_of = today();

    let total_customers = count_customers(state, owner).await?;

    let mut customer_udhar = UdharStats::default();
    let mut cursor = state
        .udhar_records
        .find(doc! { "createdBy": owner })
        .await?;
    while let Some(record) = cursor.try_next().await? {
        let status =
            effective_udhar_status(record.status, &record.due_date, record.paid_amount, as_of);
        let bucket = match status {
            UdharStatus::Pending => &mut customer_udhar.pending,
            UdharStatus::PartialPaid => &mut customer_udhar.partial_paid,
            UdharStatus::Paid => &mut customer_udhar.paid,
            UdharStatus::Overdue => &mut customer_udhar.overdue,
        };
        bucket.add(record.total_amount);
    }

    let mut shop_borrow = BorrowStats::default();
    let mut cursor = state
        .borrow_records
        .find(doc! { "createdBy": owner })
        .await?;
    while let Some(record) = cursor.try_next().await? {
        let status = effective_borrow_status(record.status, &record.due_date, as_of);
        let bucket = match status {
            BorrowStatus::Pending => &mut shop_borrow.pending,
            BorrowStatus::Paid => &mut shop_borrow.paid,
            BorrowStatus::Overdue => &mut shop_borrow.overdue,
        };
        bucket.add(record.total_amount);
    }

    let due_today = count_due_today(state, owner).await?;
    let recent_transactions = recent_activity(state, owner).await?;

    Ok(DashboardStats {
        total_customers,
        customer_udhar,
        shop_borrow,
        due_today,
        recent_transactions,
    })
}

/// Records in either ledger still Pending with a due date inside
/// [today, tomorrow).
async fn count_due_today(state: &AppState, owner: &ObjectId) -> Result<u64, ApiError> {
    let start = today().and_hms_opt(0, 0, 0).unwrap().and_utc();
    let end = start + chrono::Duration::days(1);
    let window = doc! {
        "$gte": DateTime::from_chrono(start),
        "$lt": DateTime::from_chrono(end),
    };

    let udhar = state
        .udhar_records
        .count_documents(doc! {
            "createdBy": owner,
            "status": UdharStatus::Pending.as_str(),
            "dueDate": window.clone(),
        })
        .await?;
    let borrow = state
        .borrow_records
        .count_documents(doc! {
            "createdBy": owner,
            "status": BorrowStatus::Pending.as_str(),
            "dueDate": window,
        })
        .await?;

    Ok(udhar + borrow)
}

/// The 5 newest records across both ledgers: 5 + 5 fetched, merged by
/// creation time descending, truncated to 5.
async fn recent_activity(
    state: &AppState,
    owner: &ObjectId,
) -> Result<Vec<ActivityItem>, ApiError> {
    let as_of = today();

    let mut cursor = state
        .udhar_records
        .find(doc! { "createdBy": owner })
        .sort(doc! { "createdAt": -1 })
        .limit(5)
        .await?;
    let mut udhar = Vec::new();
    while let Some(record) = cursor.try_next().await? {
        udhar.push(record);
    }

    let customer_ids: Vec<ObjectId> = udhar.iter().map(|r| r.customer.clone()).collect();
    let refs = customer_ref_map(state, &customer_ids).await?;

    let mut items: Vec<ActivityItem> = udhar
        .into_iter()
        .filter_map(|record| {
            let id = record.id?;
            let customer = refs.get(&record.customer);
            let status = effective_udhar_status(
                record.status,
                &record.due_date,
                record.paid_amount,
                as_of,
            );
            Some(ActivityItem {
                id,
                kind: "Customer Udhar",
                name: customer.map(|c| c.name.clone()).unwrap_or_else(|| "Unknown".into()),
                phone: customer.map(|c| c.phone.clone()).unwrap_or_default(),
                amount: record.total_amount,
                status: status.as_str(),
                due_date: record.due_date,
                created_at: record.created_at,
            })
        })
        .collect();

    let mut cursor = state
        .borrow_records
        .find(doc! { "createdBy": owner })
        .sort(doc! { "createdAt": -1 })
        .limit(5)
        .await?;
    while let Some(record) = cursor.try_next().await? {
        let Some(id) = record.id else { continue };
        let status = effective_borrow_status(record.status, &record.due_date, as_of);
        items.push(ActivityItem {
            id,
            kind: "Shop Borrow",
            name: record.from_name,
            phone: record.phone,
            amount: record.total_amount,
            status: status.as_str(),
            due_date: record.due_date,
            created_at: record.created_at,
        });
    }

    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    items.truncate(5);
    Ok(items)
}
