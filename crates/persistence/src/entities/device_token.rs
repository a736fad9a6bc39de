//! Device token entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{DeviceToken, Platform};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the device_tokens table.
#[derive(Debug, Clone, FromRow)]
pub struct DeviceTokenEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token: String,
    pub platform: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl From<DeviceTokenEntity> for DeviceToken {
    fn from(entity: DeviceTokenEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            token: entity.token,
            platform: entity.platform.as_deref().and_then(Platform::parse),
            created_at: entity.created_at,
            last_used_at: entity.last_used_at,
        }
    }
}
