// Customer udhar ledger: record store, payment allocation, and the
// carry-forward chain that rolls an unpaid balance into a successor record.

use bson::{DateTime, doc, oid::ObjectId, to_bson};
use chrono::NaiveDate;
use futures::stream::TryStreamExt;
use std::time::SystemTime;

use crate::error::ApiError;
use crate::models::{LineItem, PaymentEntry, UdharRecord, UdharStatus};
use crate::money::{recompute_items, remaining};
use crate::status::{advance_one_month, effective_udhar_status, today};

use super::AppState;

fn now() -> DateTime {
    DateTime::from_system_time(SystemTime::now())
}

/// Rejects malformed line items before any mutation.
pub fn validate_items(items: &[LineItem]) -> Result<(), ApiError> {
    if items.is_empty() {
        return Err(ApiError::Validation("At least one item is required".into()));
    }
    for item in items {
        if item.item_name.trim().is_empty() {
            return Err(ApiError::Validation("Item name is required".into()));
        }
        if item.quantity < 1 {
            return Err(ApiError::Validation(
                "Item quantity must be at least 1".into(),
            ));
        }
        if item.price_per_item < 0.0 {
            return Err(ApiError::Validation(
                "Item price cannot be negative".into(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Default, Clone)]
pub struct UdharListFilter {
    pub status: Option<UdharStatus>,
    pub customer: Option<ObjectId>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub page: u64,
    pub limit: u64,
}

pub fn created_range_filter(
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Option<bson::Document> {
    if start_date.is_none() && end_date.is_none() {
        return None;
    }
    let mut range = doc! {};
    if let Some(start) = start_date {
        let from = start.and_hms_opt(0, 0, 0).unwrap().and_utc();
        range.insert("$gte", DateTime::from_chrono(from));
    }
    if let Some(end) = end_date {
        // End date is inclusive through the end of that day.
        let to = end.and_hms_opt(23, 59, 59).unwrap().and_utc();
        range.insert("$lte", DateTime::from_chrono(to));
    }
    Some(range)
}

/// Maps a stored record to its read-time view: effective status and a
/// freshly derived remaining amount.
fn enrich(mut record: UdharRecord, as_of: NaiveDate) -> UdharRecord {
    record.status =
        effective_udhar_status(record.status, &record.due_date, record.paid_amount, as_of);
    record.remaining_amount = remaining(record.total_amount, record.paid_amount);
    record
}

/// Status filters select by the effective status the list displays, so the
/// stored field (which never holds Overdue) is queried through the same
/// conditions the resolver derives from.
fn apply_status_filter(query: &mut bson::Document, status: UdharStatus) {
    let day_start =
        DateTime::from_chrono(today().and_hms_opt(0, 0, 0).unwrap().and_utc());
    match status {
        UdharStatus::Paid => {
            query.insert("status", UdharStatus::Paid.as_str());
        }
        UdharStatus::PartialPaid => {
            query.insert("status", doc! { "$ne": UdharStatus::Paid.as_str() });
            query.insert("paidAmount", doc! { "$gt": 0.0 });
        }
        UdharStatus::Overdue => {
            query.insert("status", doc! { "$ne": UdharStatus::Paid.as_str() });
            query.insert("paidAmount", doc! { "$lte": 0.0 });
            query.insert("dueDate", doc! { "$lt": day_start });
        }
        UdharStatus::Pending => {
            query.insert("status", doc! { "$ne": UdharStatus::Paid.as_str() });
            query.insert("paidAmount", doc! { "$lte": 0.0 });
            query.insert("dueDate", doc! { "$gte": day_start });
        }
    }
}

pub async fn list_udhar_records(
    state: &AppState,
    owner: &ObjectId,
    filter: &UdharListFilter,
) -> Result<(Vec<UdharRecord>, u64), ApiError> {
    let mut query = doc! { "createdBy": owner };
    if let Some(status) = filter.status {
        apply_status_filter(&mut query, status);
    }
    if let Some(customer) = &filter.customer {
        query.insert("customer", customer);
    }
    if let Some(range) = created_range_filter(filter.start_date, filter.end_date) {
        query.insert("createdAt", range);
    }

    let total = state.udhar_records.count_documents(query.clone()).await?;

    let page = filter.page.max(1);
    let limit = filter.limit.max(1);
    let mut cursor = state
        .udhar_records
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

async fn find_owned(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
) -> Result<UdharRecord, ApiError> {
    state
        .udhar_records
        .find_one(doc! { "_id": id, "createdBy": owner })
        .await?
        .ok_or(ApiError::NotFound("Record"))
}

pub async fn create_udhar_record(
    state: &AppState,
    owner: &ObjectId,
    customer: &ObjectId,
    mut items: Vec<LineItem>,
    due_date: DateTime,
    notes: Option<String>,
) -> Result<UdharRecord, ApiError> {
    validate_items(&items)?;
    let total_amount = recompute_items(&mut items);

    let mut record = UdharRecord {
        id: None,
        customer: customer.clone(),
        items,
        total_amount,
        paid_amount: 0.0,
        remaining_amount: total_amount,
        payments: Vec::new(),
        due_date,
        status: UdharStatus::Pending,
        notes: notes.unwrap_or_default(),
        paid_at: None,
        carried_forward_from: None,
        created_by: owner.clone(),
        created_at: Some(now()),
        updated_at: None,
    };

    let res = state.udhar_records.insert_one(record.clone()).await?;
    record.id = res.inserted_id.as_object_id();
    Ok(enrich(record, today()))
}

/// Edits items, due date or notes. Payment state is never touched here; the
/// allocator owns it. The new total may not drop below what is already paid.
pub async fn update_udhar_record(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
    customer: Option<ObjectId>,
    items: Option<Vec<LineItem>>,
    due_date: Option<DateTime>,
    notes: Option<String>,
) -> Result<UdharRecord, ApiError> {
    let existing = find_owned(state, id, owner).await?;

    let mut set = doc! { "updatedAt": now() };

    let total_amount = match items {
        Some(mut items) => {
            validate_items(&items)?;
            let total = recompute_items(&mut items);
            set.insert(
                "items",
                to_bson(&items).map_err(|e| ApiError::Validation(e.to_string()))?,
            );
            set.insert("totalAmount", total);
            total
        }
        None => existing.total_amount,
    };

    if total_amount < existing.paid_amount {
        return Err(ApiError::Validation(
            "Total cannot be below the amount already paid".into(),
        ));
    }
    set.insert(
        "remainingAmount",
        remaining(total_amount, existing.paid_amount),
    );

    if let Some(customer) = customer {
        set.insert("customer", customer);
    }
    if let Some(due_date) = due_date {
        set.insert("dueDate", due_date);
    }
    if let Some(notes) = notes {
        set.insert("notes", notes);
    }

    state
        .udhar_records
        .update_one(doc! { "_id": id, "createdBy": owner }, doc! { "$set": set })
        .await?;

    Ok(enrich(find_owned(state, id, owner).await?, today()))
}

pub async fn delete_udhar_record(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
) -> Result<(), ApiError> {
    let res = state
        .udhar_records
        .delete_one(doc! { "_id": id, "createdBy": owner })
        .await?;
    if res.deleted_count == 0 {
        return Err(ApiError::NotFound("Record"));
    }
    Ok(())
}

/// Outcome of a payment allocation: what was actually applied after
/// clamping, and the record as stored afterwards.
#[derive(Debug, Clone)]
pub struct AppliedPayment {
    pub applied: f64,
    pub record: UdharRecord,
}

/// Applies a partial or full payment. The write pins the paid amount read
/// at load time, so two concurrent payments cannot silently merge into a
/// lost update; the loser fails with `Conflict` and can retry.
pub async fn record_partial_payment(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
    amount: f64,
    note: Option<String>,
) -> Result<AppliedPayment, ApiError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::Validation(
            "A valid payment amount is required".into(),
        ));
    }

    let record = find_owned(state, id, owner).await?;
    if record.status == UdharStatus::Paid {
        return Err(ApiError::InvalidState(
            "This record is already fully paid".into(),
        ));
    }

    // Overpayment is capped, not rejected.
    let applied = amount.min(remaining(record.total_amount, record.paid_amount));
    let paid_amount = record.paid_amount + applied;
    let remaining_amount = remaining(record.total_amount, paid_amount);
    let (status, paid_at) = if remaining_amount == 0.0 {
        (UdharStatus::Paid, Some(now()))
    } else {
        (UdharStatus::PartialPaid, None)
    };

    let entry = PaymentEntry {
        amount: applied,
        date: now(),
        note: note.unwrap_or_default(),
    };

    let mut set = doc! {
        "paidAmount": paid_amount,
        "remainingAmount": remaining_amount,
        "status": status.as_str(),
        "updatedAt": now(),
    };
    if let Some(paid_at) = paid_at {
        set.insert("paidAt", paid_at);
    }

    let res = state
        .udhar_records
        .update_one(
            doc! {
                "_id": id,
                "createdBy": owner,
                "paidAmount": record.paid_amount,
                "status": { "$ne": UdharStatus::Paid.as_str() },
            },
            doc! {
                "$set": set,
                "$push": { "payments": to_bson(&entry).map_err(|e| ApiError::Validation(e.to_string()))? },
            },
        )
        .await?;

    if res.matched_count == 0 {
        // The record still exists, so another write won the race.
        find_owned(state, id, owner).await?;
        return Err(ApiError::Conflict);
    }

    let record = enrich(find_owned(state, id, owner).await?, today());
    Ok(AppliedPayment { applied, record })
}

/// Settles the full remaining balance. Idempotent: a second call appends
/// nothing and leaves the amounts untouched.
pub async fn mark_udhar_paid(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
) -> Result<UdharRecord, ApiError> {
    let record = find_owned(state, id, owner).await?;
    let outstanding = remaining(record.total_amount, record.paid_amount);

    let mut update = doc! {
        "$set": {
            "paidAmount": record.total_amount,
            "remainingAmount": 0.0,
            "status": UdharStatus::Paid.as_str(),
            "paidAt": now(),
            "updatedAt": now(),
        }
    };
    if outstanding > 0.0 {
        let entry = PaymentEntry {
            amount: outstanding,
            date: now(),
            note: "Marked as fully paid".into(),
        };
        update.insert(
            "$push",
            doc! { "payments": to_bson(&entry).map_err(|e| ApiError::Validation(e.to_string()))? },
        );
    }

    let res = state
        .udhar_records
        .update_one(
            doc! { "_id": id, "createdBy": owner, "paidAmount": record.paid_amount },
            update,
        )
        .await?;

    if res.matched_count == 0 {
        find_owned(state, id, owner).await?;
        return Err(ApiError::Conflict);
    }

    Ok(enrich(find_owned(state, id, owner).await?, today()))
}

/// Closes a record by transferring its unpaid remainder into a fresh linked
/// record with a later due date. The outstanding balance is moved, not
/// collected: the source gets a zero-amount marker payment and is settled.
pub async fn carry_forward(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
    new_due_date: Option<DateTime>,
    note: Option<String>,
) -> Result<(UdharRecord, UdharRecord), ApiError> {
    let record = find_owned(state, id, owner).await?;
    if record.status == UdharStatus::Paid {
        return Err(ApiError::InvalidState(
            "Record is already fully paid, nothing to carry forward".into(),
        ));
    }
    let outstanding = remaining(record.total_amount, record.paid_amount);
    if outstanding == 0.0 {
        return Err(ApiError::InvalidState(
            "No remaining balance to carry forward".into(),
        ));
    }

    let marker = PaymentEntry {
        amount: 0.0,
        date: now(),
        note: format!("Balance of Rs.{outstanding} carried forward"),
    };
    let closing_notes = if record.notes.is_empty() {
        format!("Remaining Rs.{outstanding} carried forward")
    } else {
        format!("{} | Remaining Rs.{outstanding} carried forward", record.notes)
    };

    let res = state
        .udhar_records
        .update_one(
            doc! { "_id": id, "createdBy": owner, "paidAmount": record.paid_amount },
            doc! {
                "$set": {
                    "paidAmount": record.total_amount,
                    "remainingAmount": 0.0,
                    "status": UdharStatus::Paid.as_str(),
                    "paidAt": now(),
                    "notes": closing_notes,
                    "updatedAt": now(),
                },
                "$push": { "payments": to_bson(&marker).map_err(|e| ApiError::Validation(e.to_string()))? },
            },
        )
        .await?;
    if res.matched_count == 0 {
        find_owned(state, id, owner).await?;
        return Err(ApiError::Conflict);
    }

    let due_date = new_due_date.unwrap_or_else(|| advance_one_month(&record.due_date));
    let created_on = record
        .created_at
        .map(|d| d.to_chrono().date_naive().to_string())
        .unwrap_or_else(|| "an earlier date".into());

    let mut successor = UdharRecord {
        id: None,
        customer: record.customer.clone(),
        items: vec![LineItem {
            item_name: "Carried forward balance".into(),
            quantity: 1,
            price_per_item: outstanding,
            subtotal: outstanding,
        }],
        total_amount: outstanding,
        paid_amount: 0.0,
        remaining_amount: outstanding,
        payments: Vec::new(),
        due_date,
        status: UdharStatus::Pending,
        notes: note.unwrap_or_else(|| format!("Carried forward from record dated {created_on}")),
        paid_at: None,
        carried_forward_from: record.id.clone(),
        created_by: owner.clone(),
        created_at: Some(now()),
        updated_at: None,
    };
    let inserted = state.udhar_records.insert_one(successor.clone()).await?;
    successor.id = inserted.inserted_id.as_object_id();

    let as_of = today();
    let closed = enrich(find_owned(state, id, owner).await?, as_of);
    Ok((closed, enrich(successor, as_of)))
}
