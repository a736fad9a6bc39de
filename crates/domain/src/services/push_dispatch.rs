//! Push dispatcher.
//!
//! Drains push-eligible notifications: for each one it resolves the
//! recipient's device tokens, fans the message out through the push provider
//! and records the outcome back onto the notification. A pass keeps no state
//! of its own, so re-running it after a crash or a failed delivery is safe.
//! Two overlapping passes may push the same notification twice.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::push::{PushMessage, PushProvider};
use crate::errors::DomainError;
use crate::models::Notification;
use crate::stores::{DeviceRegistry, NotificationStore};

/// Error recorded when the recipient has no registered device.
pub const NO_REGISTERED_DEVICE: &str = "no registered device";

/// Default number of notifications selected per pass.
pub const DEFAULT_BATCH_SIZE: i64 = 100;

/// Dispatcher configuration.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// When false, a pass selects nothing and sends nothing.
    pub enabled: bool,
    /// Maximum notifications handled per pass.
    pub batch_size: i64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Final state of one notification after a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// At least one device accepted the message.
    Delivered,
    /// Every device failed.
    Failed,
    /// The recipient has no registered device.
    NoDevice,
}

/// Result of dispatching a single notification.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub notification_id: Uuid,
    pub status: DeliveryStatus,
    pub tokens_attempted: usize,
    pub tokens_succeeded: usize,
    pub invalid_tokens_removed: u64,
    /// Error stored on the notification, if any.
    pub error: Option<String>,
}

/// Totals for one dispatcher pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub selected: usize,
    pub delivered: usize,
    pub failed: usize,
    pub no_device: usize,
    pub invalid_tokens_removed: u64,
    /// Notifications skipped because a store call failed.
    pub errors: usize,
}

impl DispatchSummary {
    fn record(&mut self, outcome: &DispatchOutcome) {
        match outcome.status {
            DeliveryStatus::Delivered => self.delivered += 1,
            DeliveryStatus::Failed => self.failed += 1,
            DeliveryStatus::NoDevice => self.no_device += 1,
        }
        self.invalid_tokens_removed += outcome.invalid_tokens_removed;
    }
}

/// Delivers pending notifications through a push provider.
pub struct PushDispatcher {
    notifications: Arc<dyn NotificationStore>,
    devices: Arc<dyn DeviceRegistry>,
    provider: Arc<dyn PushProvider>,
    config: DispatchConfig,
}

impl PushDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        devices: Arc<dyn DeviceRegistry>,
        provider: Arc<dyn PushProvider>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            notifications,
            devices,
            provider,
            config,
        }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Run one pass over at most `batch_size` pending notifications.
    ///
    /// Only the initial selection can fail the pass; errors on individual
    /// notifications are logged and counted in [`DispatchSummary::errors`].
    pub async fn run_once(&self) -> Result<DispatchSummary, DomainError> {
        let mut summary = DispatchSummary::default();

        if !self.config.enabled {
            debug!("Push dispatch disabled, skipping pass");
            return Ok(summary);
        }

        let pending = self
            .notifications
            .select_pending(self.config.batch_size)
            .await?;
        summary.selected = pending.len();

        for notification in &pending {
            match self.dispatch(notification).await {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    error!(
                        notification_id = %notification.id,
                        error = %e,
                        "Failed to dispatch notification"
                    );
                    summary.errors += 1;
                }
            }
        }

        if summary.selected > 0 {
            info!(
                selected = summary.selected,
                delivered = summary.delivered,
                failed = summary.failed,
                no_device = summary.no_device,
                errors = summary.errors,
                "Push dispatch pass completed"
            );
        }

        Ok(summary)
    }

    /// Deliver one notification to every device of its recipient and record the result.
    ///
    /// The notification counts as sent when at least one device accepts it;
    /// when all fail, the last provider error is stored.
    pub async fn dispatch(
        &self,
        notification: &Notification,
    ) -> Result<DispatchOutcome, DomainError> {
        let tokens = self.devices.list_tokens(notification.user_id).await?;

        if tokens.is_empty() {
            debug!(
                notification_id = %notification.id,
                user_id = %notification.user_id,
                "No registered device for recipient"
            );
            self.notifications
                .record_push_result(notification.id, false, Some(NO_REGISTERED_DEVICE))
                .await?;
            return Ok(DispatchOutcome {
                notification_id: notification.id,
                status: DeliveryStatus::NoDevice,
                tokens_attempted: 0,
                tokens_succeeded: 0,
                invalid_tokens_removed: 0,
                error: Some(NO_REGISTERED_DEVICE.to_string()),
            });
        }

        let message = PushMessage::for_notification(notification);
        let mut succeeded = 0;
        let mut last_error: Option<String> = None;
        let mut invalid_tokens = Vec::new();

        for device in &tokens {
            match self.provider.send(&device.token, &message).await {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    warn!(
                        notification_id = %notification.id,
                        device_token_id = %device.id,
                        error = %e,
                        "Push delivery to device failed"
                    );
                    if e.is_invalid_token() {
                        invalid_tokens.push(device.token.clone());
                    }
                    last_error = Some(e.to_string());
                }
            }
        }

        let invalid_tokens_removed = self.remove_invalid_tokens(&invalid_tokens).await;

        let (status, error) = if succeeded > 0 {
            (DeliveryStatus::Delivered, None)
        } else {
            (DeliveryStatus::Failed, last_error)
        };

        self.notifications
            .record_push_result(
                notification.id,
                status == DeliveryStatus::Delivered,
                error.as_deref(),
            )
            .await?;

        Ok(DispatchOutcome {
            notification_id: notification.id,
            status,
            tokens_attempted: tokens.len(),
            tokens_succeeded: succeeded,
            invalid_tokens_removed,
            error,
        })
    }

    async fn remove_invalid_tokens(&self, tokens: &[String]) -> u64 {
        if tokens.is_empty() {
            return 0;
        }

        match self.devices.remove_tokens(tokens).await {
            Ok(removed) => {
                info!(removed = removed, "Removed invalid device tokens");
                removed
            }
            Err(e) => {
                error!(error = %e, "Failed to remove invalid device tokens");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewNotification;
    use crate::services::push::{MockPushProvider, PushError};
    use crate::stores::InMemoryStore;

    fn dispatcher(store: &Arc<InMemoryStore>, provider: MockPushProvider) -> PushDispatcher {
        PushDispatcher::new(
            store.clone(),
            store.clone(),
            Arc::new(provider),
            DispatchConfig::default(),
        )
    }

    async fn create(store: &InMemoryStore, user_id: Uuid) -> Notification {
        store
            .create(NewNotification::new(user_id, "HSA reminder", "Contribute before year end"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_no_device_records_error() {
        let store = Arc::new(InMemoryStore::new());
        let n = create(&store, Uuid::new_v4()).await;

        let summary = dispatcher(&store, MockPushProvider::new())
            .run_once()
            .await
            .unwrap();
        assert_eq!(summary.selected, 1);
        assert_eq!(summary.no_device, 1);

        let stored = store.find_by_id(n.id).await.unwrap().unwrap();
        assert!(!stored.push_sent);
        assert_eq!(stored.push_error.as_deref(), Some(NO_REGISTERED_DEVICE));
    }

    #[tokio::test]
    async fn test_no_device_is_reselected_next_pass() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        let n = create(&store, user).await;
        let dispatcher = dispatcher(&store, MockPushProvider::new());

        dispatcher.run_once().await.unwrap();
        store.register(user, "late-device", Some("ios")).await.unwrap();
        let summary = dispatcher.run_once().await.unwrap();

        assert_eq!(summary.delivered, 1);
        let stored = store.find_by_id(n.id).await.unwrap().unwrap();
        assert!(stored.push_sent);
        assert!(stored.push_error.is_none());
    }

    #[tokio::test]
    async fn test_one_success_one_failure_marks_sent() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        store.register(user, "good", Some("ios")).await.unwrap();
        store.register(user, "bad", Some("android")).await.unwrap();
        let n = create(&store, user).await;

        let provider = MockPushProvider::new()
            .with_failure("bad", PushError::Rejected("quota exceeded".to_string()));
        let summary = dispatcher(&store, provider).run_once().await.unwrap();
        assert_eq!(summary.delivered, 1);

        let stored = store.find_by_id(n.id).await.unwrap().unwrap();
        assert!(stored.push_sent);
        assert!(stored.push_error.is_none());
    }

    #[tokio::test]
    async fn test_all_failures_store_one_of_the_errors() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        store.register(user, "a", None).await.unwrap();
        store.register(user, "b", None).await.unwrap();
        let n = create(&store, user).await;

        let err_a = PushError::Rejected("quota exceeded".to_string());
        let err_b = PushError::Transport("connection reset".to_string());
        let provider = MockPushProvider::new()
            .with_failure("a", err_a.clone())
            .with_failure("b", err_b.clone());

        let summary = dispatcher(&store, provider).run_once().await.unwrap();
        assert_eq!(summary.failed, 1);

        let stored = store.find_by_id(n.id).await.unwrap().unwrap();
        assert!(!stored.push_sent);
        let error = stored.push_error.unwrap();
        assert!(error == err_a.to_string() || error == err_b.to_string());
        assert_eq!(store.select_pending(10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_tokens_are_removed() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        store.register(user, "stale", None).await.unwrap();
        store.register(user, "fresh", None).await.unwrap();
        create(&store, user).await;

        let provider = MockPushProvider::new().with_failure("stale", PushError::InvalidToken);
        let summary = dispatcher(&store, provider).run_once().await.unwrap();

        assert_eq!(summary.invalid_tokens_removed, 1);
        let remaining = store.list_tokens(user).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].token, "fresh");
    }

    #[tokio::test]
    async fn test_sent_notification_not_redelivered() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        store.register(user, "device", None).await.unwrap();
        create(&store, user).await;

        let provider = Arc::new(MockPushProvider::new());
        let dispatcher = PushDispatcher::new(
            store.clone(),
            store.clone(),
            provider.clone(),
            DispatchConfig::default(),
        );

        dispatcher.run_once().await.unwrap();
        let second = dispatcher.run_once().await.unwrap();

        assert_eq!(second.selected, 0);
        assert_eq!(provider.sent_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_should_push_false_is_skipped() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        store.register(user, "device", None).await.unwrap();
        store
            .create(NewNotification::new(user, "Quiet", "In-app only").with_should_push(false))
            .await
            .unwrap();

        let summary = dispatcher(&store, MockPushProvider::new())
            .run_once()
            .await
            .unwrap();
        assert_eq!(summary, DispatchSummary::default());
    }

    #[tokio::test]
    async fn test_batch_size_bounds_pass() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        for _ in 0..5 {
            create(&store, user).await;
        }

        let dispatcher = PushDispatcher::new(
            store.clone(),
            store.clone(),
            Arc::new(MockPushProvider::new()),
            DispatchConfig {
                enabled: true,
                batch_size: 2,
            },
        );
        let summary = dispatcher.run_once().await.unwrap();
        assert_eq!(summary.selected, 2);
    }

    #[tokio::test]
    async fn test_disabled_dispatcher_does_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let n = create(&store, Uuid::new_v4()).await;

        let dispatcher = PushDispatcher::new(
            store.clone(),
            store.clone(),
            Arc::new(MockPushProvider::new()),
            DispatchConfig {
                enabled: false,
                batch_size: 10,
            },
        );
        let summary = dispatcher.run_once().await.unwrap();
        assert_eq!(summary.selected, 0);

        let stored = store.find_by_id(n.id).await.unwrap().unwrap();
        assert!(stored.push_error.is_none());
    }

    #[tokio::test]
    async fn test_dispatch_outcome_counts() {
        let store = Arc::new(InMemoryStore::new());
        let user = Uuid::new_v4();
        store.register(user, "one", None).await.unwrap();
        store.register(user, "two", None).await.unwrap();
        let n = create(&store, user).await;

        let outcome = dispatcher(&store, MockPushProvider::new())
            .dispatch(&n)
            .await
            .unwrap();
        assert_eq!(outcome.status, DeliveryStatus::Delivered);
        assert_eq!(outcome.tokens_attempted, 2);
        assert_eq!(outcome.tokens_succeeded, 2);
        assert!(outcome.error.is_none());
    }
}
