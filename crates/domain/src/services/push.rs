//! Push delivery abstractions.
//!
//! The push provider (FCM in production) is an opaque gateway that takes a
//! device token and a message and reports success or an error string.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use serde::Serialize;
use thiserror::Error;

use crate::models::Notification;

/// Message handed to the push provider for one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// String-only key/value payload delivered alongside the notification.
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    /// Build the message for a stored notification.
    pub fn for_notification(notification: &Notification) -> Self {
        let mut data = BTreeMap::new();
        data.insert("notification_id".to_string(), notification.id.to_string());
        data.insert(
            "category".to_string(),
            notification.category.as_str().to_string(),
        );
        data.insert(
            "priority".to_string(),
            notification.priority.as_str().to_string(),
        );

        Self {
            title: notification.title.clone(),
            body: notification.body.clone(),
            data,
        }
    }
}

/// Error reported by a push provider for a single token.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PushError {
    /// Token is unknown to the provider or malformed; it will never work again.
    #[error("invalid or unregistered device token")]
    InvalidToken,

    #[error("push provider rejected message: {0}")]
    Rejected(String),

    #[error("push provider unreachable: {0}")]
    Transport(String),
}

impl PushError {
    pub fn is_invalid_token(&self) -> bool {
        matches!(self, PushError::InvalidToken)
    }
}

/// External push delivery gateway.
#[async_trait::async_trait]
pub trait PushProvider: Send + Sync {
    /// Deliver `message` to a single device token.
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), PushError>;
}

/// Mock push provider for development and testing.
///
/// Logs messages instead of sending them. Individual tokens can be scripted
/// to fail, and every attempted delivery is recorded.
#[derive(Debug, Default)]
pub struct MockPushProvider {
    /// Whether every send should fail.
    pub simulate_failure: bool,
    failures: HashMap<String, PushError>,
    sent: Mutex<Vec<(String, PushMessage)>>,
}

impl MockPushProvider {
    /// Create a mock provider that accepts every token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock provider that fails every send.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Script a failure for one token.
    pub fn with_failure(mut self, token: impl Into<String>, error: PushError) -> Self {
        self.failures.insert(token.into(), error);
        self
    }

    /// Tokens and messages that were delivered successfully, in order.
    pub fn sent_messages(&self) -> Vec<(String, PushMessage)> {
        self.sent
            .lock()
            .map(|sent| sent.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl PushProvider for MockPushProvider {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        if self.simulate_failure {
            tracing::warn!(token = %token, "Mock push provider simulating failure");
            return Err(PushError::Rejected("Simulated failure".to_string()));
        }

        if let Some(error) = self.failures.get(token) {
            tracing::warn!(token = %token, error = %error, "Mock push provider scripted failure");
            return Err(error.clone());
        }

        tracing::info!(
            token = %token,
            title = %message.title,
            "Mock: Would send push notification"
        );

        if let Ok(mut sent) = self.sent.lock() {
            sent.push((token.to_string(), message.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NotificationCategory, NotificationPriority};
    use chrono::Utc;
    use uuid::Uuid;

    fn notification() -> Notification {
        Notification {
            id: Uuid::nil(),
            user_id: Uuid::new_v4(),
            title: "PTO balance".to_string(),
            body: "You have 5 PTO days expiring".to_string(),
            category: NotificationCategory::Pto,
            priority: NotificationPriority::High,
            read_at: None,
            is_cleared: false,
            should_push: true,
            push_sent: false,
            push_error: None,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_message_for_notification() {
        let message = PushMessage::for_notification(&notification());
        assert_eq!(message.title, "PTO balance");
        assert_eq!(message.data["category"], "pto");
        assert_eq!(message.data["priority"], "high");
        assert_eq!(message.data["notification_id"], Uuid::nil().to_string());
    }

    #[test]
    fn test_push_error_display() {
        assert_eq!(
            PushError::Rejected("quota exceeded".to_string()).to_string(),
            "push provider rejected message: quota exceeded"
        );
        assert!(PushError::InvalidToken.is_invalid_token());
        assert!(!PushError::Transport("timeout".to_string()).is_invalid_token());
    }

    #[tokio::test]
    async fn test_mock_provider_send() {
        let provider = MockPushProvider::new();
        let message = PushMessage::for_notification(&notification());

        assert!(provider.send("token123", &message).await.is_ok());
        let sent = provider.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "token123");
    }

    #[tokio::test]
    async fn test_mock_provider_failure() {
        let provider = MockPushProvider::failing();
        let message = PushMessage::for_notification(&notification());

        let result = provider.send("token123", &message).await;
        assert!(matches!(result, Err(PushError::Rejected(_))));
        assert!(provider.sent_messages().is_empty());
    }

    #[tokio::test]
    async fn test_mock_provider_scripted_failure() {
        let provider = MockPushProvider::new().with_failure("bad", PushError::InvalidToken);
        let message = PushMessage::for_notification(&notification());

        assert_eq!(
            provider.send("bad", &message).await,
            Err(PushError::InvalidToken)
        );
        assert!(provider.send("good", &message).await.is_ok());
    }
}
