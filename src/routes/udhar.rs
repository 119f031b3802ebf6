// Customer udhar endpoints: CRUD plus the payment and carry-forward
// actions.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{LineItem, UdharRecord};
use crate::response::ApiResponse;
use crate::session::Owner;
use crate::state::{
    AppState, CustomerRef, DEFAULT_PAGE_LIMIT, UdharListFilter, carry_forward, create_udhar_record,
    customer_ref_map, delete_udhar_record, list_udhar_records, mark_udhar_paid,
    record_partial_payment, update_udhar_record,
};

use super::{
    clean_opt, parse_due_date, parse_object_id, parse_optional_date, parse_optional_due_date,
    parse_optional_object_id, parse_udhar_status,
};

/// A ledger record with its customer reference resolved for display.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UdharView {
    #[serde(flatten)]
    pub record: UdharRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<CustomerRef>,
}

async fn attach_customers(
    state: &AppState,
    records: Vec<UdharRecord>,
) -> Result<Vec<UdharView>, ApiError> {
    let ids: Vec<_> = records.iter().map(|r| r.customer.clone()).collect();
    let refs = customer_ref_map(state, &ids).await?;
    Ok(records
        .into_iter()
        .map(|record| {
            let customer_info = refs.get(&record.customer).cloned();
            UdharView {
                record,
                customer_info,
            }
        })
        .collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UdharListQuery {
    pub status: Option<String>,
    pub customer_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn udhar_index(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Query(query): Query<UdharListQuery>,
) -> Result<Json<ApiResponse<Vec<UdharView>>>, ApiError> {
    let filter = UdharListFilter {
        status: query
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(parse_udhar_status)
            .transpose()?,
        customer: parse_optional_object_id(query.customer_id.as_deref())?,
        start_date: parse_optional_date(query.start_date.as_deref())?,
        end_date: parse_optional_date(query.end_date.as_deref())?,
        page: query.page.unwrap_or(1).max(1),
        limit: query.limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, 100),
    };

    let (records, total) = list_udhar_records(&state, &owner, &filter).await?;
    let views = attach_customers(&state, records).await?;
    Ok(Json(ApiResponse::page(
        views,
        total,
        filter.page,
        filter.limit,
    )))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUdharBody {
    pub customer: String,
    pub items: Vec<LineItem>,
    pub due_date: String,
    pub notes: Option<String>,
}

pub async fn udhar_create(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Json(body): Json<CreateUdharBody>,
) -> Result<(StatusCode, Json<ApiResponse<UdharView>>), ApiError> {
    let customer = parse_object_id(&body.customer)?;
    let due_date = parse_due_date(&body.due_date)?;

    let record =
        create_udhar_record(&state, &owner, &customer, body.items, due_date, clean_opt(body.notes))
            .await?;
    let mut views = attach_customers(&state, vec![record]).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("Udhar record added", views.remove(0))),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUdharBody {
    pub customer: Option<String>,
    pub items: Option<Vec<LineItem>>,
    pub due_date: Option<String>,
    pub notes: Option<String>,
}

pub async fn udhar_update(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(body): Json<UpdateUdharBody>,
) -> Result<Json<ApiResponse<UdharView>>, ApiError> {
    let id = parse_object_id(&id)?;
    let customer = parse_optional_object_id(body.customer.as_deref())?;
    let due_date = parse_optional_due_date(body.due_date.as_deref())?;

    let record =
        update_udhar_record(&state, &id, &owner, customer, body.items, due_date, body.notes)
            .await?;
    let mut views = attach_customers(&state, vec![record]).await?;
    Ok(Json(ApiResponse::message("Record updated", views.remove(0))))
}

pub async fn udhar_delete(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = parse_object_id(&id)?;
    delete_udhar_record(&state, &id, &owner).await?;
    Ok(Json(ApiResponse::ok("Record deleted")))
}

pub async fn udhar_mark_paid(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<UdharView>>, ApiError> {
    let id = parse_object_id(&id)?;
    let record = mark_udhar_paid(&state, &id, &owner).await?;
    let mut views = attach_customers(&state, vec![record]).await?;
    Ok(Json(ApiResponse::message("Marked as paid", views.remove(0))))
}

#[derive(Debug, Deserialize)]
pub struct PaymentBody {
    pub amount: f64,
    pub note: Option<String>,
}

pub async fn udhar_partial_payment(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(body): Json<PaymentBody>,
) -> Result<Json<ApiResponse<UdharView>>, ApiError> {
    let id = parse_object_id(&id)?;
    let outcome =
        record_partial_payment(&state, &id, &owner, body.amount, clean_opt(body.note)).await?;

    let message = format!(
        "Payment of Rs.{} recorded. Remaining: Rs.{}",
        outcome.applied, outcome.record.remaining_amount
    );
    let mut views = attach_customers(&state, vec![outcome.record]).await?;
    Ok(Json(ApiResponse::message(message, views.remove(0))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarryForwardBody {
    pub new_due_date: Option<String>,
    pub note: Option<String>,
}

/// The closed source record and its successor, returned together.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarryForwardOutcome {
    pub original_record: UdharView,
    pub new_record: UdharView,
}

pub async fn udhar_carry_forward(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(body): Json<CarryForwardBody>,
) -> Result<(StatusCode, Json<ApiResponse<CarryForwardOutcome>>), ApiError> {
    let id = parse_object_id(&id)?;
    let new_due_date = parse_optional_due_date(body.new_due_date.as_deref())?;

    let (closed, successor) =
        carry_forward(&state, &id, &owner, new_due_date, clean_opt(body.note)).await?;

    let carried = successor.total_amount;
    let due = successor.due_date.to_chrono().date_naive();
    let message =
        format!("Rs.{carried} carried forward. New record created with due date {due}.");

    let mut views = attach_customers(&state, vec![closed, successor]).await?;
    let original_record = views.remove(0);
    let new_record = views.remove(0);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message(
            message,
            CarryForwardOutcome {
                original_record,
                new_record,
            },
        )),
    ))
}
