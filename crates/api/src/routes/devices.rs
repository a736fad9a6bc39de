//! Device token registration endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use domain::models::{mask_token, DeviceTokenResponse, RegisterDeviceTokenRequest};
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CallerId;
use crate::middleware::metrics::record_device_registered;

/// Register (or refresh) a push token for the caller.
///
/// POST /api/v1/devices/register
pub async fn register_device(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Json(request): Json<RegisterDeviceTokenRequest>,
) -> Result<(StatusCode, Json<DeviceTokenResponse>), ApiError> {
    request.validate()?;

    let device = state
        .devices
        .register(user_id, &request.token, request.platform.as_deref())
        .await?;

    info!(
        user_id = %user_id,
        device_token_id = %device.id,
        platform = ?device.platform,
        "Device token registered"
    );
    record_device_registered();

    Ok((StatusCode::CREATED, Json(device.into())))
}

/// Remove one of the caller's push tokens. Unknown tokens are not an error.
///
/// DELETE /api/v1/devices/:token
pub async fn unregister_device(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
    Path(token): Path<String>,
) -> Result<StatusCode, ApiError> {
    let removed = state.devices.unregister(user_id, &token).await?;

    info!(
        user_id = %user_id,
        token = %mask_token(&token),
        removed = removed,
        "Device token unregistered"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// List the caller's push tokens, masked.
///
/// GET /api/v1/devices
pub async fn list_devices(
    State(state): State<AppState>,
    CallerId(user_id): CallerId,
) -> Result<Json<Vec<DeviceTokenResponse>>, ApiError> {
    let devices = state.devices.list_tokens(user_id).await?;
    Ok(Json(devices.into_iter().map(Into::into).collect()))
}
