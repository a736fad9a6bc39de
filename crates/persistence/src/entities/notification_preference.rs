//! Notification preference entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{NewsFrequency, NotificationPreferences, SocialUpdates};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the notification_preferences table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationPreferenceEntity {
    pub user_id: Uuid,
    pub pto_alerts: bool,
    pub fsa_alerts: bool,
    pub hsa_alerts: bool,
    pub k401_alerts: bool,
    pub deductible_alerts: bool,
    pub trend_alerts: bool,
    pub news_frequency: String,
    pub social_updates: String,
    pub gov_notifications: bool,
    pub all_disabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NotificationPreferenceEntity> for NotificationPreferences {
    fn from(entity: NotificationPreferenceEntity) -> Self {
        Self {
            user_id: entity.user_id,
            pto_alerts: entity.pto_alerts,
            fsa_alerts: entity.fsa_alerts,
            hsa_alerts: entity.hsa_alerts,
            k401_alerts: entity.k401_alerts,
            deductible_alerts: entity.deductible_alerts,
            trend_alerts: entity.trend_alerts,
            news_frequency: NewsFrequency::parse(&entity.news_frequency)
                .unwrap_or(NewsFrequency::Daily),
            social_updates: SocialUpdates::parse(&entity.social_updates)
                .unwrap_or(SocialUpdates::Yes),
            gov_notifications: entity.gov_notifications,
            all_disabled: entity.all_disabled,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
