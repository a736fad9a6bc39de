//! Device token repository for database operations.

use async_trait::async_trait;
use domain::models::{DeviceToken, Platform};
use domain::stores::DeviceRegistry;
use domain::DomainError;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::DeviceTokenEntity;
use crate::metrics::QueryTimer;

/// Repository for device token database operations.
#[derive(Clone)]
pub struct DeviceTokenRepository {
    pool: PgPool,
}

impl DeviceTokenRepository {
    /// Create a new repository instance.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceRegistry for DeviceTokenRepository {
    async fn upsert(
        &self,
        user_id: Uuid,
        token: &str,
        platform: Option<Platform>,
    ) -> Result<DeviceToken, DomainError> {
        let timer = QueryTimer::new("upsert_device_token");
        let result = sqlx::query_as::<_, DeviceTokenEntity>(
            r#"
            INSERT INTO device_tokens (user_id, token, platform)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, token) DO UPDATE
            SET platform = EXCLUDED.platform,
                last_used_at = NOW()
            RETURNING id, user_id, token, platform, created_at, last_used_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(platform.map(|p| p.as_str()))
        .fetch_one(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.into())
    }

    async fn unregister(&self, user_id: Uuid, token: &str) -> Result<bool, DomainError> {
        let timer = QueryTimer::new("delete_device_token");
        let result = sqlx::query(
            r#"
            DELETE FROM device_tokens
            WHERE user_id = $1 AND token = $2
            "#,
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.rows_affected() > 0)
    }

    async fn list_tokens(&self, user_id: Uuid) -> Result<Vec<DeviceToken>, DomainError> {
        let timer = QueryTimer::new("list_device_tokens");
        let result = sqlx::query_as::<_, DeviceTokenEntity>(
            r#"
            SELECT id, user_id, token, platform, created_at, last_used_at
            FROM device_tokens
            WHERE user_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.into_iter().map(Into::into).collect())
    }

    async fn remove_tokens(&self, tokens: &[String]) -> Result<u64, DomainError> {
        if tokens.is_empty() {
            return Ok(0);
        }

        let timer = QueryTimer::new("remove_device_tokens");
        let result = sqlx::query(
            r#"
            DELETE FROM device_tokens
            WHERE token = ANY($1)
            "#,
        )
        .bind(tokens)
        .execute(&self.pool)
        .await;
        timer.finish(&result);

        Ok(result?.rows_affected())
    }
}
