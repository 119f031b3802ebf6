// Sales endpoints: finalize, receipt lookup, list, edit, delete.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{LineItem, PaymentMethod, Sale};
use crate::response::ApiResponse;
use crate::session::Owner;
use crate::state::{
    AppState, CustomerRef, SaleListFilter, create_sale, customer_ref_map, delete_sale, get_sale,
    list_sales, update_sale,
};

use super::{clean_opt, parse_object_id, parse_optional_date, parse_optional_object_id};

const SALES_PAGE_LIMIT: u64 = 15;

/// A sale with its customer reference resolved, when one is attached.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleView {
    #[serde(flatten)]
    pub sale: Sale,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<CustomerRef>,
}

async fn attach_customers(
    state: &AppState,
    sales: Vec<Sale>,
) -> Result<Vec<SaleView>, ApiError> {
    let ids: Vec<_> = sales.iter().filter_map(|s| s.customer.clone()).collect();
    let refs = customer_ref_map(state, &ids).await?;
    Ok(sales
        .into_iter()
        .map(|sale| {
            let customer_info = sale
                .customer
                .as_ref()
                .and_then(|id| refs.get(id))
                .cloned();
            SaleView {
                sale,
                customer_info,
            }
        })
        .collect())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleListQuery {
    pub customer_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

pub async fn sales_index(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Query(query): Query<SaleListQuery>,
) -> Result<Json<ApiResponse<Vec<SaleView>>>, ApiError> {
    let filter = SaleListFilter {
        customer: parse_optional_object_id(query.customer_id.as_deref())?,
        start_date: parse_optional_date(query.start_date.as_deref())?,
        end_date: parse_optional_date(query.end_date.as_deref())?,
        page: query.page.unwrap_or(1).max(1),
        limit: query.limit.unwrap_or(SALES_PAGE_LIMIT).clamp(1, 100),
    };

    let (sales, total) = list_sales(&state, &owner, &filter).await?;
    let views = attach_customers(&state, sales).await?;
    Ok(Json(ApiResponse::page(
        views,
        total,
        filter.page,
        filter.limit,
    )))
}

pub async fn sales_show(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<SaleView>>, ApiError> {
    let id = parse_object_id(&id)?;
    let sale = get_sale(&state, &id, &owner).await?;
    let mut views = attach_customers(&state, vec![sale]).await?;
    Ok(Json(ApiResponse::data(views.remove(0))))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleBody {
    pub customer: Option<String>,
    pub walk_in_name: Option<String>,
    pub items: Vec<LineItem>,
    pub amount_received: f64,
    pub discount: Option<f64>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

pub async fn sales_create(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Json(body): Json<CreateSaleBody>,
) -> Result<(StatusCode, Json<ApiResponse<SaleView>>), ApiError> {
    let customer = parse_optional_object_id(body.customer.as_deref())?;
    let sale = create_sale(
        &state,
        &owner,
        customer,
        clean_opt(body.walk_in_name),
        body.items,
        body.amount_received,
        body.discount.unwrap_or(0.0),
        body.payment_method.unwrap_or_default(),
        clean_opt(body.notes),
    )
    .await?;
    let mut views = attach_customers(&state, vec![sale]).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::message("Sale recorded", views.remove(0))),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSaleBody {
    /// An empty string detaches the customer; absent leaves it unchanged.
    pub customer: Option<String>,
    pub walk_in_name: Option<String>,
    pub items: Option<Vec<LineItem>>,
    pub amount_received: Option<f64>,
    pub discount: Option<f64>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
}

pub async fn sales_update(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
    Json(body): Json<UpdateSaleBody>,
) -> Result<Json<ApiResponse<SaleView>>, ApiError> {
    let id = parse_object_id(&id)?;
    let customer = match body.customer.as_deref().map(str::trim) {
        None => None,
        Some("") => Some(None),
        Some(value) => Some(Some(parse_object_id(value)?)),
    };

    let sale = update_sale(
        &state,
        &id,
        &owner,
        customer,
        body.walk_in_name,
        body.items,
        body.amount_received,
        body.discount,
        body.payment_method,
        body.notes,
    )
    .await?;
    let mut views = attach_customers(&state, vec![sale]).await?;
    Ok(Json(ApiResponse::message("Sale updated", views.remove(0))))
}

pub async fn sales_delete(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let id = parse_object_id(&id)?;
    delete_sale(&state, &id, &owner).await?;
    Ok(Json(ApiResponse::ok("Sale deleted")))
}
