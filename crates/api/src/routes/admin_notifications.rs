//! Operator endpoints for creating, inspecting and dispatching notifications.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use domain::models::{NewNotification, Notification, NotificationCategory, NotificationPriority};
use domain::services::{DispatchOutcome, DispatchSummary, PushDispatcher};
use serde::{Deserialize, Serialize};
use shared::pagination::clamp_limit;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_dispatch_summary, record_notifications_created};

/// Request to create a notification for one user or the whole audience.
#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    /// Recipient; omitted means every known user.
    pub user_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub category: NotificationCategory,
    #[serde(default)]
    pub priority: NotificationPriority,
    #[serde(default = "default_true")]
    pub should_push: bool,
    /// Deliver the created notifications immediately instead of waiting for the sweep.
    #[serde(default)]
    pub push_now: bool,
}

fn default_true() -> bool {
    true
}

impl SendNotificationRequest {
    fn for_user(&self, user_id: Uuid) -> NewNotification {
        NewNotification::new(user_id, self.title.clone(), self.body.clone())
            .with_category(self.category)
            .with_priority(self.priority)
            .with_should_push(self.should_push)
    }
}

#[derive(Debug, Serialize)]
pub struct SendNotificationResponse {
    pub recipients: usize,
    pub created: usize,
    pub suppressed: usize,
    pub notification_ids: Vec<Uuid>,
    /// Whether the created notifications were pushed synchronously.
    pub pushed_now: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub push_results: Vec<DispatchOutcome>,
    /// Set when creation stopped partway; `notification_ids` lists what was committed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct CleanupResponse {
    pub cleared: u64,
}

/// Create notifications, applying each recipient's preferences.
///
/// POST /api/v1/admin/notifications/send
pub async fn send_notification(
    State(state): State<AppState>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<(StatusCode, Json<SendNotificationResponse>), ApiError> {
    // Validate once up front so a bad payload creates nothing.
    request.for_user(Uuid::nil()).validate()?;

    let recipients = match request.user_id {
        Some(user_id) => vec![user_id],
        None => state.preferences.audience().await?,
    };

    let mut created: Vec<Notification> = Vec::new();
    let mut suppressed = 0;
    let mut failure: Option<ApiError> = None;

    for user_id in &recipients {
        // Read-only lookup: sending must not enrol the recipient in the broadcast audience.
        let result = match state.preferences.effective(*user_id).await {
            Ok(preferences) if !preferences.allows(request.category, request.priority) => {
                suppressed += 1;
                continue;
            }
            Ok(_) => state.notifications.create(request.for_user(*user_id)).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(notification) => created.push(notification),
            Err(e) => {
                failure = Some(e.into());
                break;
            }
        }
    }

    record_notifications_created(created.len(), suppressed);

    if let Some(err) = failure {
        if created.is_empty() {
            return Err(err);
        }
        let notification_ids: Vec<Uuid> = created.iter().map(|n| n.id).collect();
        error!(
            recipients = recipients.len(),
            created = created.len(),
            notification_ids = ?notification_ids,
            error = %err,
            "Admin notification send stopped partway"
        );
        return Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(SendNotificationResponse {
                recipients: recipients.len(),
                created: created.len(),
                suppressed,
                notification_ids,
                pushed_now: false,
                push_results: Vec::new(),
                error: Some(
                    "Send stopped after a storage error; listed notifications were created"
                        .to_string(),
                ),
            }),
        ));
    }

    info!(
        recipients = recipients.len(),
        created = created.len(),
        suppressed = suppressed,
        category = %request.category,
        priority = %request.priority,
        "Admin notification sent"
    );

    let dispatcher = if request.push_now && request.should_push {
        state.active_dispatcher().cloned()
    } else {
        None
    };
    let push_results = match &dispatcher {
        Some(dispatcher) => push_now(dispatcher, &created).await,
        None => Vec::new(),
    };

    Ok((
        StatusCode::CREATED,
        Json(SendNotificationResponse {
            recipients: recipients.len(),
            created: created.len(),
            suppressed,
            notification_ids: created.iter().map(|n| n.id).collect(),
            pushed_now: dispatcher.is_some(),
            push_results,
            error: None,
        }),
    ))
}

async fn push_now(dispatcher: &PushDispatcher, created: &[Notification]) -> Vec<DispatchOutcome> {
    let mut outcomes = Vec::with_capacity(created.len());
    for notification in created {
        match dispatcher.dispatch(notification).await {
            Ok(outcome) => outcomes.push(outcome),
            // The notification stays pending and the sweep picks it up.
            Err(e) => error!(
                notification_id = %notification.id,
                error = %e,
                "Immediate push failed"
            ),
        }
    }
    outcomes
}

/// Most recent notifications across all users.
///
/// GET /api/v1/admin/notifications?limit=
pub async fn list_recent(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Notification>>, ApiError> {
    let limit = clamp_limit(query.limit);
    Ok(Json(state.notifications.list_recent(limit).await?))
}

/// Hide notifications from inboxes (one user, or everyone).
///
/// POST /api/v1/admin/notifications/cleanup?user_id=
pub async fn cleanup(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<CleanupResponse>, ApiError> {
    let cleared = state.notifications.clear(query.user_id).await?;
    info!(user_id = ?query.user_id, cleared = cleared, "Notifications cleared");
    Ok(Json(CleanupResponse { cleared }))
}

/// Run one dispatcher pass now.
///
/// POST /api/v1/admin/notifications/dispatch
pub async fn dispatch_pending(
    State(state): State<AppState>,
) -> Result<Json<DispatchSummary>, ApiError> {
    let dispatcher = state
        .active_dispatcher()
        .ok_or_else(|| ApiError::ServiceUnavailable("Push delivery is disabled".to_string()))?;

    let summary = dispatcher.run_once().await?;
    record_dispatch_summary(&summary);
    Ok(Json(summary))
}
