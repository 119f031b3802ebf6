// routes/mod.rs
// JSON route handlers and shared request-parsing helpers.

pub mod borrow;
pub mod customers;
pub mod dashboard;
pub mod notifications;
pub mod sales;
pub mod udhar;

pub use borrow::*;
pub use customers::*;
pub use dashboard::*;
pub use notifications::*;
pub use sales::*;
pub use udhar::*;

use std::str::FromStr;

use bson::{DateTime, oid::ObjectId};
use chrono::NaiveDate;

use crate::error::ApiError;
use crate::models::{BorrowStatus, UdharStatus};

pub(super) fn parse_object_id(value: &str) -> Result<ObjectId, ApiError> {
    ObjectId::from_str(value.trim()).map_err(|_| ApiError::Validation("Invalid ID format".into()))
}

pub(super) fn parse_optional_object_id(
    value: Option<&str>,
) -> Result<Option<ObjectId>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_object_id(v).map(Some),
        None => Ok(None),
    }
}

/// Date-only filter bound, `YYYY-MM-DD`.
pub(super) fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| ApiError::Validation("Invalid date, expected YYYY-MM-DD".into()))
}

pub(super) fn parse_optional_date(value: Option<&str>) -> Result<Option<NaiveDate>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_date(v).map(Some),
        None => Ok(None),
    }
}

/// Due dates arrive either date-only or as a full RFC 3339 timestamp.
pub(super) fn parse_due_date(value: &str) -> Result<DateTime, ApiError> {
    let trimmed = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(DateTime::from_chrono(
            date.and_hms_opt(0, 0, 0).unwrap().and_utc(),
        ));
    }
    chrono::DateTime::parse_from_rfc3339(trimmed)
        .map(|dt| DateTime::from_chrono(dt.with_timezone(&chrono::Utc)))
        .map_err(|_| ApiError::Validation("Invalid due date".into()))
}

pub(super) fn parse_optional_due_date(
    value: Option<&str>,
) -> Result<Option<DateTime>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => parse_due_date(v).map(Some),
        None => Ok(None),
    }
}

pub(super) fn parse_udhar_status(value: &str) -> Result<UdharStatus, ApiError> {
    match value {
        "Pending" => Ok(UdharStatus::Pending),
        "PartialPaid" => Ok(UdharStatus::PartialPaid),
        "Paid" => Ok(UdharStatus::Paid),
        "Overdue" => Ok(UdharStatus::Overdue),
        _ => Err(ApiError::Validation("Invalid status filter".into())),
    }
}

pub(super) fn parse_borrow_status(value: &str) -> Result<BorrowStatus, ApiError> {
    match value {
        "Pending" => Ok(BorrowStatus::Pending),
        "Paid" => Ok(BorrowStatus::Paid),
        "Overdue" => Ok(BorrowStatus::Overdue),
        _ => Err(ApiError::Validation("Invalid status filter".into())),
    }
}

pub(super) fn clean_opt(input: Option<String>) -> Option<String> {
    input.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
