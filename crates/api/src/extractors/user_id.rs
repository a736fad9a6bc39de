//! Caller identity extractor.
//!
//! User routes identify the caller by the `X-User-Id` header. Authentication
//! itself happens upstream; this service only trusts the forwarded id.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use crate::error::ApiError;

/// Header carrying the caller's user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// The calling user's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CallerId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("Missing X-User-Id header".to_string()))?;

        let value = raw
            .to_str()
            .map_err(|_| ApiError::Validation("X-User-Id must be a UUID".to_string()))?;

        Uuid::parse_str(value.trim())
            .map(CallerId)
            .map_err(|_| ApiError::Validation("X-User-Id must be a UUID".to_string()))
    }
}
