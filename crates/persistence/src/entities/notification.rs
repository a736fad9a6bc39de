//! Notification entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Notification, NotificationCategory, NotificationPriority};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub category: String,
    pub priority: String,
    pub read_at: Option<DateTime<Utc>>,
    pub is_cleared: bool,
    pub should_push: bool,
    pub push_sent: bool,
    pub push_error: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationEntity> for Notification {
    fn from(entity: NotificationEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            title: entity.title,
            body: entity.body,
            category: NotificationCategory::parse(&entity.category).unwrap_or_default(),
            priority: NotificationPriority::parse(&entity.priority).unwrap_or_default(),
            read_at: entity.read_at,
            is_cleared: entity.is_cleared,
            should_push: entity.should_push,
            push_sent: entity.push_sent,
            push_error: entity.push_error,
            sent_at: entity.sent_at,
            created_at: entity.created_at,
        }
    }
}
