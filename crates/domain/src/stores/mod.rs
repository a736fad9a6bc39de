//! Store abstractions for notifications, device tokens and preferences.
//!
//! The push dispatcher and the HTTP layer only talk to these traits. The
//! PostgreSQL implementations live in the persistence crate; [`memory`]
//! provides an in-process implementation for development and tests.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::DomainError;
use crate::models::{
    DeviceToken, NewNotification, Notification, NotificationPreferences, Platform,
    PreferenceChanges,
};

pub use memory::InMemoryStore;

/// Persistent notification records.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a new notification with `push_sent = false`.
    async fn create(&self, new: NewNotification) -> Result<Notification, DomainError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, DomainError>;

    /// Set the read flag. Fails with `NotFound` unless the notification belongs to `user_id`.
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, DomainError>;

    /// Push-eligible notifications (`should_push AND NOT push_sent`), oldest first.
    async fn select_pending(&self, limit: i64) -> Result<Vec<Notification>, DomainError>;

    /// Record a delivery attempt. Success clears `push_error`; failure overwrites it.
    async fn record_push_result(
        &self,
        id: Uuid,
        success: bool,
        error: Option<&str>,
    ) -> Result<(), DomainError>;

    /// Not-cleared notifications of a user, newest first.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, DomainError>;

    /// All notifications, newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Notification>, DomainError>;

    /// Hide every not-cleared notification (of one user, or of everyone). Returns the count.
    async fn clear(&self, user_id: Option<Uuid>) -> Result<u64, DomainError>;
}

/// Registered push tokens per user.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Register a token for a user, validating the platform first.
    ///
    /// Registering an existing (user, token) pair updates it in place.
    async fn register(
        &self,
        user_id: Uuid,
        token: &str,
        platform: Option<&str>,
    ) -> Result<DeviceToken, DomainError> {
        shared::validation::validate_push_token(token).map_err(|e| {
            DomainError::Validation(
                e.message
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "Invalid token".to_string()),
            )
        })?;
        let platform = Platform::parse_optional(platform)?;
        self.upsert(user_id, token, platform).await
    }

    /// Insert or refresh a (user, token) row. Callers should go through [`register`](Self::register).
    async fn upsert(
        &self,
        user_id: Uuid,
        token: &str,
        platform: Option<Platform>,
    ) -> Result<DeviceToken, DomainError>;

    /// Delete the (user, token) row. Returns whether a row existed.
    async fn unregister(&self, user_id: Uuid, token: &str) -> Result<bool, DomainError>;

    async fn list_tokens(&self, user_id: Uuid) -> Result<Vec<DeviceToken>, DomainError>;

    /// Delete every row holding one of `tokens`, regardless of owner.
    async fn remove_tokens(&self, tokens: &[String]) -> Result<u64, DomainError>;
}

/// Per-user notification preferences.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Stored preferences, without creating a row.
    async fn find(&self, user_id: Uuid) -> Result<Option<NotificationPreferences>, DomainError>;

    /// Stored preferences, or the defaults when the user has none. Never writes.
    async fn effective(&self, user_id: Uuid) -> Result<NotificationPreferences, DomainError> {
        Ok(self
            .find(user_id)
            .await?
            .unwrap_or_else(|| NotificationPreferences::defaults(user_id)))
    }

    /// Fetch preferences, creating the default row on first access.
    async fn get_or_create(&self, user_id: Uuid) -> Result<NotificationPreferences, DomainError>;

    async fn update(
        &self,
        user_id: Uuid,
        changes: &PreferenceChanges,
    ) -> Result<NotificationPreferences, DomainError>;

    /// Every user known through a preferences row or a registered device token.
    async fn audience(&self) -> Result<Vec<Uuid>, DomainError>;
}
