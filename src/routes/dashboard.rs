// Dashboard endpoint.

use std::sync::Arc;

use axum::{Json, extract::State};

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::session::Owner;
use crate::state::{AppState, DashboardStats, dashboard_stats};

pub async fn dashboard_show(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> Result<Json<ApiResponse<DashboardStats>>, ApiError> {
    let stats = dashboard_stats(&state, &owner).await?;
    Ok(Json(ApiResponse::data(stats)))
}
