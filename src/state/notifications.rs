// Notification feed, read side only. The external reminder job writes
// these documents once per record per day; this service lists them and
// tracks the read flag.

use bson::{doc, oid::ObjectId};
use futures::stream::TryStreamExt;

use crate::error::ApiError;
use crate::models::Notification;

use super::AppState;

const FEED_LIMIT: i64 = 50;

pub async fn list_notifications(
    state: &AppState,
    owner: &ObjectId,
) -> Result<(Vec<Notification>, u64), ApiError> {
    let mut cursor = state
        .notifications
        .find(doc! { "owner": owner })
        .sort(doc! { "createdAt": -1 })
        .limit(FEED_LIMIT)
        .await?;
    let mut notifications = Vec::new();
    while let Some(notification) = cursor.try_next().await? {
        notifications.push(notification);
    }

    let unread = state
        .notifications
        .count_documents(doc! { "owner": owner, "isRead": false })
        .await?;

    Ok((notifications, unread))
}

pub async fn mark_notification_read(
    state: &AppState,
    id: &ObjectId,
    owner: &ObjectId,
) -> Result<Notification, ApiError> {
    let res = state
        .notifications
        .update_one(
            doc! { "_id": id, "owner": owner },
            doc! { "$set": { "isRead": true } },
        )
        .await?;
    if res.matched_count == 0 {
        return Err(ApiError::NotFound("Notification"));
    }

    state
        .notifications
        .find_one(doc! { "_id": id, "owner": owner })
        .await?
        .ok_or(ApiError::NotFound("Notification"))
}

pub async fn mark_all_notifications_read(
    state: &AppState,
    owner: &ObjectId,
) -> Result<(), ApiError> {
    state
        .notifications
        .update_many(
            doc! { "owner": owner, "isRead": false },
            doc! { "$set": { "isRead": true } },
        )
        .await?;
    Ok(())
}
