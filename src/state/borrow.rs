// Shop borrow ledger: credit the shopkeeper took from suppliers. Simpler
// lifecycle than udhar: no partial payments, no carry-forward.

use bson::{DateTime, doc, oid::ObjectId, to_bson};
use chrono::NaiveDate;
use futures::stream::TryStreamExt;
use std::time::SystemTime;

use crate::error::ApiError;
use crate::models::{BorrowRecord, BorrowStatus, LineItem};
use crate::money::recompute_items;
use crate::status::{effective_borrow_status, today};

use super::{AppState, regex_escape};
use super::udhar::{created_range_filter, validate_items};

fn now() -> DateTime {
    DateTime::from_system_time(SystemTime::now())
}

#[derive(Debug, Default, Clone)]
pub struct BorrowListFilter {
    pub status: Option<BorrowStatus>,
    pub search: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: u64,
    pub limit: u64,
}

fn enrich(mut record: BorrowRecord, as_of: NaiveDate) -> BorrowRecord {
    record.status = effective_borrow_status(record.status, &record.due_date, as_of);
    record
}

/// Status filters select by the effective status, same as the udhar list.
fn apply_status_filter(query: &mut bson::Document, status: BorrowStatus) {
    let day_start =
        DateTime::from_chrono(today().and_hms_opt(0, 0, 0).unwrap().and_utc());
    match status {
        BorrowStatus::Paid => {
            query.insert("status", BorrowStatus::Paid.as_str());
        }
        BorrowStatus::Overdue => {
            query.insert("status", doc! { "$ne": BorrowStatus::Paid.as_str() });
            query.insert("dueDate", doc! { "$lt": day_start });
        }
        BorrowStatus::Pending => {
            query.insert("status", doc! { "$ne": BorrowStatus::Paid.as_str() });
            query.insert("dueDate", doc! { "$gte": day_start });
        }
    }
}

pub async fn list_borrow_records(
    state: &AppState,
    owner: &ObjectId,
    filter: &BorrowListFilter,
) -> Result<(Vec<BorrowRecord>, u64), ApiError> {
    let mut query = doc! { "createdBy": owner };
    if let Some(status) = filter.status {
        apply_status_filter(&mut query, status);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = regex_escape(search.trim());
        query.insert(
            "$or",
            vec![
                doc! { "fromName": { "$regex": &pattern, "$options": "i" } },
                doc! { "phone": { "$regex": &pattern, "$options": "i" } },
            ],
        );
    }
    if let Some(range) = created_range_filter(filter.start_date, filter.end_date) {
        query.insert("createdAt", range);
    }

    let total = state.borrow_records.count_documents(query.clone()).await?;

    let page = filter.page.max(1);
    let limit = filter.limit.max(1);
    let mut cursor = state
        .borrow_records
        .find(query)
        .sort(doc! { "createdAt": -1 })
        .skip((page - 1) * limit)
        .limit(limit as i64)
        .await?;

    let as_of = today();
    let mut records = Vec::new();
    while let Some(record) = cursor.try_next().await? {
        records.push(enrich(record, as_of));
    }

    Ok((records, total))
}

pub async fn create_borrow_record(
    state: &AppState,
    owner: &ObjectId,
    from_name: &str,
    phone: &str,
    mut items: Vec<LineItem>,
    due_date: DateTime,
    notes: Option<String>,
) -> Result<BorrowRecord, ApiError> {
    if from_name.trim().is_empty() {
        return Err(ApiError::Validation("Name of lender is required".into()));
    }
    if phone.trim().is_empty() {
        return Err(ApiError::Validation("Phone number is required".into()));
    }
    validate_items(&items)?;
    let total_amount = recompute_items(&mut items);

    let mut record = BorrowRecord {
        id: None,
        from_name: from_name.trim().to_string(),
        phone: phone.trim().to_string(),
        items,
        total_amount,
        due_date,
        status: BorrowStatus::Pending,
        notes: notes.unwrap_or_default(),
        paid_at: None,
        created_by: owner.clone(),
        created_at: Some(now()),
        updated_at: None,
    };

    let res = state.borrow_records.insert_one(record.clone()).await?;
    record.id = res.inserted_id.as_object_id();
    Ok(enrich(record, today()))
}

pub async fn update_borrow_record(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
    from_name: Option<String>,
    phone: Option<String>,
    items: Option<Vec<LineItem>>,
    due_date: Option<DateTime>,
    notes: Option<String>,
) -> Result<BorrowRecord, ApiError> {
    let mut set = doc! { "updatedAt": now() };

    if let Some(from_name) = from_name {
        if from_name.trim().is_empty() {
            return Err(ApiError::Validation("Name of lender is required".into()));
        }
        set.insert("fromName", from_name.trim());
    }
    if let Some(phone) = phone {
        if phone.trim().is_empty() {
            return Err(ApiError::Validation("Phone number is required".into()));
        }
        set.insert("phone", phone.trim());
    }
    if let Some(mut items) = items {
        validate_items(&items)?;
        let total = recompute_items(&mut items);
        set.insert(
            "items",
            to_bson(&items).map_err(|e| ApiError::Validation(e.to_string()))?,
        );
        set.insert("totalAmount", total);
    }
    if let Some(due_date) = due_date {
        set.insert("dueDate", due_date);
    }
    if let Some(notes) = notes {
        set.insert("notes", notes);
    }

    let res = state
        .borrow_records
        .update_one(doc! { "_id": id, "createdBy": owner }, doc! { "$set": set })
        .await?;
    if res.matched_count == 0 {
        return Err(ApiError::NotFound("Record"));
    }

    let record = state
        .borrow_records
        .find_one(doc! { "_id": id, "createdBy": owner })
        .await?
        .ok_or(ApiError::NotFound("Record"))?;
    Ok(enrich(record, today()))
}

pub async fn delete_borrow_record(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
) -> Result<(), ApiError> {
    let res = state
        .borrow_records
        .delete_one(doc! { "_id": id, "createdBy": owner })
        .await?;
    if res.deleted_count == 0 {
        return Err(ApiError::NotFound("Record"));
    }
    Ok(())
}

pub async fn mark_borrow_paid(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
) -> Result<BorrowRecord, ApiError> {
    let res = state
        .borrow_records
        .update_one(
            doc! { "_id": id, "createdBy": owner },
            doc! { "$set": {
                "status": BorrowStatus::Paid.as_str(),
                "paidAt": now(),
                "updatedAt": now(),
            } },
        )
        .await?;
    if res.matched_count == 0 {
        return Err(ApiError::NotFound("Record"));
    }

    let record = state
        .borrow_records
        .find_one(doc! { "_id": id, "createdBy": owner })
        .await?
        .ok_or(ApiError::NotFound("Record"))?;
    Ok(enrich(record, today()))
}
