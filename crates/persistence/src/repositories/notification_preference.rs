//! Notification preference repository for database operations.

use async_trait::async_trait;
use domain::models::{NotificationPreferences, PreferenceChanges};
use domain::stores::PreferenceStore;
use domain::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::NotificationPreferenceEntity;
use crate::metrics::QueryTimer;

/// Repository for notification preference database operations.
#[derive(Clone)]
pub struct NotificationPreferenceRepository {
    pool: PgPool,
}

impl NotificationPreferenceRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PreferenceStore for NotificationPreferenceRepository {
    async fn find(&self, user_id: Uuid) -> Result<Option<NotificationPreferences>, DomainError> {
        let timer = QueryTimer::new("find_preferences");
        let result = sqlx::query_as::<_, NotificationPreferenceEntity>(
            r#"
            SELECT user_id, pto_alerts, fsa_alerts, hsa_alerts, k401_alerts,
                   deductible_alerts, trend_alerts, news_frequency, social_updates,
                   gov_notifications, all_disabled, created_at, updated_at
            FROM notification_preferences
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.map(Into::into))
    }

    async fn get_or_create(&self, user_id: Uuid) -> Result<NotificationPreferences, DomainError> {
        let timer = QueryTimer::new("get_or_create_preferences");
        // The no-op update makes RETURNING yield the existing row on conflict.
        let result = sqlx::query_as::<_, NotificationPreferenceEntity>(
            r#"
            INSERT INTO notification_preferences (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING user_id, pto_alerts, fsa_alerts, hsa_alerts, k401_alerts,
                      deductible_alerts, trend_alerts, news_frequency, social_updates,
                      gov_notifications, all_disabled, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.into())
    }

    async fn update(
        &self,
        user_id: Uuid,
        changes: &PreferenceChanges,
    ) -> Result<NotificationPreferences, DomainError> {
        self.get_or_create(user_id).await?;

        let timer = QueryTimer::new("update_preferences");
        let result = sqlx::query_as::<_, NotificationPreferenceEntity>(
            r#"
            UPDATE notification_preferences
            SET pto_alerts = COALESCE($2, pto_alerts),
                fsa_alerts = COALESCE($3, fsa_alerts),
                hsa_alerts = COALESCE($4, hsa_alerts),
                k401_alerts = COALESCE($5, k401_alerts),
                deductible_alerts = COALESCE($6, deductible_alerts),
                trend_alerts = COALESCE($7, trend_alerts),
                news_frequency = COALESCE($8, news_frequency),
                social_updates = COALESCE($9, social_updates),
                gov_notifications = COALESCE($10, gov_notifications),
                all_disabled = COALESCE($11, all_disabled),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING user_id, pto_alerts, fsa_alerts, hsa_alerts, k401_alerts,
                      deductible_alerts, trend_alerts, news_frequency, social_updates,
                      gov_notifications, all_disabled, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(changes.pto_alerts)
        .bind(changes.fsa_alerts)
        .bind(changes.hsa_alerts)
        .bind(changes.k401_alerts)
        .bind(changes.deductible_alerts)
        .bind(changes.trend_alerts)
        .bind(changes.news_frequency.map(|f| f.as_str()))
        .bind(changes.social_updates.map(|s| s.as_str()))
        .bind(changes.gov_notifications)
        .bind(changes.all_disabled)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.into())
    }

    async fn audience(&self) -> Result<Vec<Uuid>, DomainError> {
        let timer = QueryTimer::new("notification_audience");
        let result = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT user_id FROM notification_preferences
            UNION
            SELECT user_id FROM device_tokens
            ORDER BY user_id
            "#,
        )
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?)
    }
}
