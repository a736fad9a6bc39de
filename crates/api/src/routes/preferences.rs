//! Notification preference endpoints.

use axum::{extract::State, Json};
use domain::models::{NotificationPreferences, PreferenceChanges};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CallerId;

/// GET /api/v1/notification-preferences
pub async fn get_preferences(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> Result<Json<NotificationPreferences>, ApiError> {
    Ok(Json(state.preferences.get_or_create(user_id).await?))
}

/// PATCH /api/v1/notification-preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Json(changes): Json<PreferenceChanges>,
) -> Result<Json<NotificationPreferences>, ApiError> {
    let preferences = state.preferences.update(user_id, &changes).await?;
    info!(user_id = %user_id, "Notification preferences updated");
    Ok(Json(preferences))
}
