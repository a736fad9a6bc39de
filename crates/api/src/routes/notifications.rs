//! Notification inbox endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::Notification;
use serde::Serialize;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CallerId;

/// Inbox listing.
#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<Notification>,
    pub unread_count: usize,
}

/// The caller's not-cleared notifications, newest first.
///
/// GET /api/v1/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let notifications = state.notifications.list_for_user(user_id).await?;
    let unread_count = notifications.iter().filter(|n| !n.is_read()).count();

    Ok(Json(NotificationListResponse {
        notifications,
        unread_count,
    }))
}

/// Mark one of the caller's notifications as read.
///
/// PATCH /api/v1/notifications/:notification_id/read
pub async fn mark_read(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(notification_id): Path<Uuid>,
) -> Result<Json<Notification>, ApiError> {
    let notification = state
        .notifications
        .mark_read(notification_id, user_id)
        .await?;
    Ok(Json(notification))
}
