// Notification feed endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Serialize;

use crate::error::ApiError;
use crate::models::Notification;
use crate::response::ApiResponse;
use crate::session::Owner;
use crate::state::{
    AppState, list_notifications, mark_all_notifications_read, mark_notification_read,
};

use super::parse_object_id;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    pub unread_count: u64,
    pub notifications: Vec<Notification>,
}

pub async fn notifications_index(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> Result<Json<ApiResponse<NotificationFeed>>, ApiError> {
    let (notifications, unread_count) = list_notifications(&state, &owner).await?;
    Ok(Json(ApiResponse::data(NotificationFeed {
        unread_count,
        notifications,
    })))
}

pub async fn notifications_mark_read(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Notification>>, ApiError> {
    let id = parse_object_id(&id)?;
    let notification = mark_notification_read(&state, &id, &owner).await?;
    Ok(Json(ApiResponse::message(
        "Notification marked as read",
        notification,
    )))
}

pub async fn notifications_mark_all_read(
    State(state): State<Arc<AppState>>,
    Owner(owner): Owner,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    mark_all_notifications_read(&state, &owner).await?;
    Ok(Json(ApiResponse::ok("All notifications marked as read")))
}
