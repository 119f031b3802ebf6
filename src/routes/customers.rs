// Customer directory endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::models::Customer;
use crate::response::ApiResponse;
use crate::session::Owner;
use crate::state::{AppState, create_customer, delete_customer, list_customers, update_customer};

use super::parse_object_id;

#[derive(Debug, Deserialize)]
pub struct CustomerListQuery {
    pub search: Option<String>,
}

pub async fn customers_index(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Query(query): Query<CustomerListQuery>,
) -> Result<Json<ApiResponse<Vec<Customer>>>, ApiError> {
    let customers = list_customers(&state, &owner, query.search.as_deref()).await?;
    Ok(Json(ApiResponse::data(customers)))
}

#[derive(Debug, Deserialize)]
pub struct CreateCustomerBody {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
}

pub async fn customers_create(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Json(body): Json<CreateCustomerBody>,
) -> Result<(StatusCode, Json<ApiResponse<Customer>>), ApiError> {
    let customer = create_customer(
        &state,
        &owner,
        &body.name,
        &body.phone,
        body.email,
        body.address,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("Customer added successfully", customer)),
    ))
}

#[derive(Debug, Deserialize)]
pub struct UpdateCustomerBody {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

pub async fn customers_update(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(body): Json<UpdateCustomerBody>,
) -> Result<Json<ApiResponse<Customer>>, ApiError> {
    let id = parse_object_id(&id)?;
    let customer = update_customer(
        &state,
        &id,
        &owner,
        body.name,
        body.phone,
        body.email,
        body.address,
    )
    .await?;
    Ok(Json(ApiResponse::message(
        "Customer updated successfully",
        customer,
    )))
}

pub async fn customers_delete(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = parse_object_id(&id)?;
    delete_customer(&state, &id, &owner).await?;
    Ok(Json(ApiResponse::ok("Customer deleted successfully")))
}
