//! Notification repository for database operations.

use async_trait::async_trait;
use domain::models::{NewNotification, Notification};
use domain::stores::NotificationStore;
use domain::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::NotificationEntity;
use crate::metrics::QueryTimer;

/// Repository for notification database operations.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationStore for NotificationRepository {
    async fn create(&self, new: NewNotification) -> Result<Notification, DomainError> {
        let timer = QueryTimer::new("create_notification");
        let result = sqlx::query_as::<_, NotificationEntity>(
            r#"
            INSERT INTO notifications (user_id, title, body, category, priority, should_push)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, title, body, category, priority, read_at, is_cleared,
                      should_push, push_sent, push_error, sent_at, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(&new.title)
        .bind(&new.body)
        .bind(new.category.as_str())
        .bind(new.priority.as_str())
        .bind(new.should_push)
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, DomainError> {
        let timer = QueryTimer::new("find_notification_by_id");
        let result = sqlx::query_as::<_, NotificationEntity>(
            r#"
            SELECT id, user_id, title, body, category, priority, read_at, is_cleared,
                   should_push, push_sent, push_error, sent_at, created_at
            FROM notifications
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.map(Into::into))
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, DomainError> {
        let timer = QueryTimer::new("mark_notification_read");
        let result = sqlx::query_as::<_, NotificationEntity>(
            r#"
            UPDATE notifications
            SET read_at = COALESCE(read_at, NOW())
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, title, body, category, priority, read_at, is_cleared,
                      should_push, push_sent, push_error, sent_at, created_at
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.finish(&result);

        result?
            .map(Into::into)
            .ok_or_else(|| DomainError::NotFound("Notification not found".to_string()))
    }

    async fn select_pending(&self, limit: i64) -> Result<Vec<Notification>, DomainError> {
        let timer = QueryTimer::new("select_pending_notifications");
        let result = sqlx::query_as::<_, NotificationEntity>(
            r#"
            SELECT id, user_id, title, body, category, priority, read_at, is_cleared,
                   should_push, push_sent, push_error, sent_at, created_at
            FROM notifications
            WHERE should_push = TRUE AND push_sent = FALSE
            ORDER BY created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn record_push_result(
        &self,
        id: Uuid,
        success: bool,
        error: Option<&str>,
    ) -> Result<(), DomainError> {
        let timer = QueryTimer::new("record_push_result");
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET push_sent = $2,
                push_error = CASE WHEN $2 THEN NULL ELSE $3 END,
                sent_at = CASE WHEN $2 THEN NOW() ELSE sent_at END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(success)
        .bind(error)
        .execute(&self.pool)
        .await;
        timer.finish(&result);

        if result?.rows_affected() == 0 {
            return Err(DomainError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, DomainError> {
        let timer = QueryTimer::new("list_notifications_for_user");
        let result = sqlx::query_as::<_, NotificationEntity>(
            r#"
            SELECT id, user_id, title, body, category, priority, read_at, is_cleared,
                   should_push, push_sent, push_error, sent_at, created_at
            FROM notifications
            WHERE user_id = $1 AND is_cleared = FALSE
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Notification>, DomainError> {
        let timer = QueryTimer::new("list_recent_notifications");
        let result = sqlx::query_as::<_, NotificationEntity>(
            r#"
            SELECT id, user_id, title, body, category, priority, read_at, is_cleared,
                   should_push, push_sent, push_error, sent_at, created_at
            FROM notifications
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit.max(0))
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn clear(&self, user_id: Option<Uuid>) -> Result<u64, DomainError> {
        let timer = QueryTimer::new("clear_notifications");
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET is_cleared = TRUE
            WHERE is_cleared = FALSE
              AND ($1::uuid IS NULL OR user_id = $1)
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.rows_affected())
    }
}
