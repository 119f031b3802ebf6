// Shop borrow endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::{BorrowRecord, LineItem};
use crate::response::ApiResponse;
use crate::session::Owner;
use crate::state::{
    AppState, BorrowListFilter, DEFAULT_PAGE_LIMIT, create_borrow_record, delete_borrow_record,
    list_borrow_records, mark_borrow_paid, update_borrow_record,
};

use super::{
    clean_opt, parse_borrow_status, parse_due_date, parse_object_id, parse_optional_date,
    parse_optional_due_date,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowListQuery {
    pub status: Option<String>,
    pub search: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn borrow_index(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Query(query): Query<BorrowListQuery>,
) -> Result<Json<ApiResponse<Vec<BorrowRecord>>>, ApiError> {
    let filter = BorrowListFilter {
        status: query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(parse_borrow_status)
            .transpose()?,
        search: clean_opt(query.search),
        start_date: parse_optional_date(query.start_date.as_deref())?,
        end_date: parse_optional_date(query.end_date.as_deref())?,
        page: query.page.unwrap_or(1).max(1),
        limit: query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, 100),
    };

    let (records, total) = list_borrow_records(&state, &owner, &filter).await?;
    Ok(Json(ApiResponse::page(
        records,
        total,
        filter.page,
        filter.limit,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBorrowBody {
    pub from_name: String,
    pub phone: String,
    pub items: Vec<LineItem>,
    pub due_date: String,
    pub notes: Option<String>,
}

pub async fn borrow_create(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Json(body): Json<CreateBorrowBody>,
) -> Result<(StatusCode, Json<ApiResponse<BorrowRecord>>), ApiError> {
    let due_date = parse_due_date(&body.due_date)?;
    let record = create_borrow_record(
        &state,
        &owner,
        &body.from_name,
        &body.phone,
        body.items,
        due_date,
        clean_opt(body.notes),
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("Borrow record added", record)),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBorrowBody {
    pub from_name: Option<String>,
    pub phone: Option<String>,
    pub items: Option<Vec<LineItem>>,
    pub due_date: Option<String>,
    pub notes: Option<String>,
}

pub async fn borrow_update(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(body): Json<UpdateBorrowBody>,
) -> Result<Json<ApiResponse<BorrowRecord>>, ApiError> {
    let id = parse_object_id(&id)?;
    let due_date = parse_optional_due_date(body.due_date.as_deref())?;
    let record = update_borrow_record(
        &state,
        &id,
        &owner,
        body.from_name,
        body.phone,
        body.items,
        due_date,
        body.notes,
    )
    .await?;
    Ok(Json(ApiResponse::message("Record updated", record)))
}

pub async fn borrow_delete(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = parse_object_id(&id)?;
    delete_borrow_record(&state, &id, &owner).await?;
    Ok(Json(ApiResponse::ok("Record deleted")))
}

pub async fn borrow_mark_paid(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<BorrowRecord>>, ApiError> {
    let id = parse_object_id(&id)?;
    let record = mark_borrow_paid(&state, &id, &owner).await?;
    Ok(Json(ApiResponse::message("Marked as paid", record)))
}
