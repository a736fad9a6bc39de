//! Device push token domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::errors::DomainError;

/// Number of trailing token characters left visible when masking.
const VISIBLE_TOKEN_CHARS: usize = 4;

/// Platform of the app installation that owns a push token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Ios,
    Android,
    Web,
}

impl Platform {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Web => "web",
        }
    }

    /// Parse from database string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ios" => Some(Self::Ios),
            "android" => Some(Self::Android),
            "web" => Some(Self::Web),
            _ => None,
        }
    }

    /// Validate an optional platform value supplied by a caller.
    ///
    /// `None` is accepted; any present value must be one of the known platforms.
    pub fn parse_optional(value: Option<&str>) -> Result<Option<Self>, DomainError> {
        match value {
            None => Ok(None),
            Some(s) => Self::parse(s).map(Some).ok_or_else(|| {
                DomainError::Validation(format!(
                    "Invalid platform '{}': must be one of ios, android, web",
                    s
                ))
            }),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| DomainError::Validation(format!("Unknown platform: {}", s)))
    }
}

/// A provider-issued push token registered by one user's app installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DeviceToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub platform: Option<Platform>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

/// Request payload for registering a push token.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterDeviceTokenRequest {
    #[validate(custom(function = "validate_token"))]
    pub token: String,

    pub platform: Option<String>,
}

/// Device token as shown back to its owner (token masked).
#[derive(Debug, Clone, Serialize)]
pub struct DeviceTokenResponse {
    pub id: Uuid,
    pub token: String,
    pub platform: Option<Platform>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl From<DeviceToken> for DeviceTokenResponse {
    fn from(token: DeviceToken) -> Self {
        Self {
            id: token.id,
            token: mask_token(&token.token),
            platform: token.platform,
            created_at: token.created_at,
            last_used_at: token.last_used_at,
        }
    }
}

/// Mask a token so only its last four characters remain visible.
pub fn mask_token(token: &str) -> String {
    let len = token.chars().count();
    if len <= VISIBLE_TOKEN_CHARS {
        return "****".to_string();
    }
    let tail: String = token.chars().skip(len - VISIBLE_TOKEN_CHARS).collect();
    format!("...{}", tail)
}

fn validate_token(token: &str) -> Result<(), validator::ValidationError> {
    shared::validation::validate_push_token(token)
}
