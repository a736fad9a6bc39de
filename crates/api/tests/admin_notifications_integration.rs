//! Integration tests for the operator notification endpoints.

mod common;

use async_trait::async_trait;
use axum::http::{Method, StatusCode};
use benefit_notifier_api::app::{create_app, AppState, Stores};
use common::{
    admin_request, anonymous_request, lazy_pool, register_token, test_config, user_request,
    TestApp,
};
use domain::models::{NewNotification, Notification};
use domain::services::{MockPushProvider, PushError, NO_REGISTERED_DEVICE};
use domain::stores::{DeviceRegistry, InMemoryStore, NotificationStore, PreferenceStore};
use domain::DomainError;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Notification store that fails every `create` after the first `allowed` ones.
struct FailingAfter {
    inner: Arc<InMemoryStore>,
    allowed: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl NotificationStore for FailingAfter {
    async fn create(&self, new: NewNotification) -> Result<Notification, DomainError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(DomainError::Storage("connection reset".to_string()));
        }
        self.inner.create(new).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, DomainError> {
        self.inner.find_by_id(id).await
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> Result<Notification, DomainError> {
        self.inner.mark_read(id, user_id).await
    }

    async fn select_pending(&self, limit: i64) -> Result<Vec<Notification>, DomainError> {
        self.inner.select_pending(limit).await
    }

    async fn record_push_result(
        &self,
        id: Uuid,
        success: bool,
        error: Option<&str>,
    ) -> Result<(), DomainError> {
        self.inner.record_push_result(id, success, error).await
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, DomainError> {
        self.inner.list_for_user(user_id).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Notification>, DomainError> {
        self.inner.list_recent(limit).await
    }

    async fn clear(&self, user_id: Option<Uuid>) -> Result<u64, DomainError> {
        self.inner.clear(user_id).await
    }
}

// ============================================================================
// Admin key handling
// ============================================================================

#[tokio::test]
async fn test_admin_route_without_key_is_unauthorized() {
    let app = TestApp::new();

    let (status, body) = app
        .send(anonymous_request(
            Method::GET,
            "/api/v1/admin/notifications",
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");
}

#[tokio::test]
async fn test_admin_route_with_wrong_key_is_unauthorized() {
    let app = TestApp::new();

    let request = axum::http::Request::builder()
        .method(Method::GET)
        .uri("/api/v1/admin/notifications")
        .header("X-Admin-Key", "not-the-key")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, _) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_unavailable_without_configured_key() {
    let mut config = test_config();
    config.security.admin_api_key = String::new();
    let app = TestApp::with_provider(config, MockPushProvider::new());

    let (status, body) = app
        .send(admin_request(Method::GET, "/api/v1/admin/notifications", None))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service_unavailable");
}

// ============================================================================
// Send
// ============================================================================

#[tokio::test]
async fn test_send_to_single_user() {
    let app = TestApp::new();
    let user_id = Uuid::new_v4();

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "user_id": user_id,
                "title": "Open enrollment starts Monday",
                "body": "Review your benefit elections.",
                "category": "news"
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recipients"], 1);
    assert_eq!(body["created"], 1);
    assert_eq!(body["suppressed"], 0);
    assert_eq!(body["pushed_now"], false);

    let inbox = app.store.list_for_user(user_id).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(!inbox[0].push_sent);
    assert!(inbox[0].should_push);
    assert_eq!(inbox[0].category.as_str(), "news");
}

#[tokio::test]
async fn test_send_respects_preferences_except_high_priority() {
    let app = TestApp::new();
    let user_id = Uuid::new_v4();

    let (status, _) = app
        .send(user_request(
            Method::PATCH,
            "/api/v1/notification-preferences",
            user_id,
            Some(json!({ "all_disabled": true })),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, suppressed) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "user_id": user_id,
                "title": "Trend update",
                "body": "Spending is up this month.",
                "category": "trend"
            })),
        ))
        .await;
    assert_eq!(suppressed["created"], 0);
    assert_eq!(suppressed["suppressed"], 1);

    let (_, urgent) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "user_id": user_id,
                "title": "FSA funds expire tomorrow",
                "body": "Submit your claims today.",
                "category": "fsa",
                "priority": "high"
            })),
        ))
        .await;
    assert_eq!(urgent["created"], 1);

    assert_eq!(app.store.list_for_user(user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_broadcast_reaches_known_users() {
    let app = TestApp::new();
    let with_token = Uuid::new_v4();
    let with_preferences = Uuid::new_v4();

    register_token(&app, with_token, "broadcast-token-0001", "android").await;
    app.send(user_request(
        Method::GET,
        "/api/v1/notification-preferences",
        with_preferences,
        None,
    ))
    .await;

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "title": "Holiday schedule",
                "body": "Offices close at noon."
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recipients"], 2);
    assert_eq!(body["created"], 2);
    assert_eq!(body["notification_ids"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_single_user_send_does_not_join_broadcast_audience() {
    let app = TestApp::new();
    let one_off = Uuid::new_v4();

    let (status, _) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "user_id": one_off,
                "title": "Welcome",
                "body": "Your benefits portal is ready."
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(app.store.audience().await.unwrap().is_empty());
    assert!(app.store.find(one_off).await.unwrap().is_none());

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "title": "Holiday schedule",
                "body": "Offices close at noon."
            })),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["recipients"], 0);
    assert_eq!(app.store.list_for_user(one_off).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_broadcast_storage_failure_reports_created_rows() {
    let store = Arc::new(InMemoryStore::new());
    let failing = Arc::new(FailingAfter {
        inner: store.clone(),
        allowed: 1,
        calls: AtomicUsize::new(0),
    });
    for _ in 0..3 {
        store.get_or_create(Uuid::new_v4()).await.unwrap();
    }
    let stores = Stores {
        notifications: failing,
        devices: store.clone(),
        preferences: store.clone(),
    };
    let router = create_app(AppState::new(test_config(), lazy_pool(), stores, None));
    let app = TestApp {
        router,
        store: store.clone(),
        provider: Arc::new(MockPushProvider::new()),
    };

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "title": "Plan year rollover",
                "body": "New deductibles apply."
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["recipients"], 3);
    assert_eq!(body["created"], 1);
    assert!(body["error"].is_string());

    let committed = store.list_recent(10).await.unwrap();
    assert_eq!(committed.len(), 1);
    assert_eq!(body["notification_ids"][0], committed[0].id.to_string());
}

#[tokio::test]
async fn test_storage_failure_before_any_row_is_plain_error() {
    let store = Arc::new(InMemoryStore::new());
    let stores = Stores {
        notifications: Arc::new(FailingAfter {
            inner: store.clone(),
            allowed: 0,
            calls: AtomicUsize::new(0),
        }),
        devices: store.clone(),
        preferences: store.clone(),
    };
    let app = TestApp {
        router: create_app(AppState::new(test_config(), lazy_pool(), stores, None)),
        store: store.clone(),
        provider: Arc::new(MockPushProvider::new()),
    };

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "user_id": Uuid::new_v4(),
                "title": "Notice",
                "body": "Body"
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "internal_error");
    assert!(store.list_recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_send_blank_title_creates_nothing() {
    let app = TestApp::new();

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "user_id": Uuid::new_v4(),
                "title": "",
                "body": "Body"
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert!(app.store.list_recent(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_send_with_push_now_delivers_immediately() {
    let app = TestApp::new();
    let user_id = Uuid::new_v4();
    register_token(&app, user_id, "push-now-token-7777", "ios").await;

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "user_id": user_id,
                "title": "Deductible met",
                "body": "You reached your annual deductible.",
                "category": "deductible",
                "push_now": true
            })),
        ))
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pushed_now"], true);
    assert_eq!(body["push_results"][0]["status"], "delivered");

    let sent = app.provider.sent_messages();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "push-now-token-7777");
    assert_eq!(sent[0].1.title, "Deductible met");

    let inbox = app.store.list_for_user(user_id).await.unwrap();
    assert!(inbox[0].push_sent);
    assert!(inbox[0].sent_at.is_some());
}

#[tokio::test]
async fn test_push_now_ignored_when_should_push_is_false() {
    let app = TestApp::new();
    let user_id = Uuid::new_v4();
    register_token(&app, user_id, "quiet-token-8888", "android").await;

    let (_, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/send",
            Some(json!({
                "user_id": user_id,
                "title": "In-app only",
                "body": "No push for this one.",
                "should_push": false,
                "push_now": true
            })),
        ))
        .await;

    assert_eq!(body["pushed_now"], false);
    assert!(app.provider.sent_messages().is_empty());
    assert!(app.store.select_pending(10).await.unwrap().is_empty());
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn test_dispatch_pending_summary() {
    let app = TestApp::new();
    let reachable = Uuid::new_v4();
    let unreachable = Uuid::new_v4();
    register_token(&app, reachable, "dispatch-token-1234", "android").await;

    app.store
        .create(NewNotification::new(reachable, "Hello", "World"))
        .await
        .unwrap();
    let orphan = app
        .store
        .create(NewNotification::new(unreachable, "Hello", "Nobody"))
        .await
        .unwrap();

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/dispatch",
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["selected"], 2);
    assert_eq!(body["delivered"], 1);
    assert_eq!(body["no_device"], 1);
    assert_eq!(body["failed"], 0);

    let orphan = app.store.find_by_id(orphan.id).await.unwrap().unwrap();
    assert!(!orphan.push_sent);
    assert_eq!(orphan.push_error.as_deref(), Some(NO_REGISTERED_DEVICE));

    // Still pending: the next pass selects it again.
    let pending = app.store.select_pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, orphan.id);
}

#[tokio::test]
async fn test_dispatch_removes_invalid_tokens() {
    let provider =
        MockPushProvider::new().with_failure("stale-token-0000", PushError::InvalidToken);
    let app = TestApp::with_provider(test_config(), provider);
    let user_id = Uuid::new_v4();
    register_token(&app, user_id, "stale-token-0000", "android").await;
    register_token(&app, user_id, "fresh-token-1111", "ios").await;
    app.store
        .create(NewNotification::new(user_id, "Reminder", "HSA statement ready"))
        .await
        .unwrap();

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/dispatch",
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delivered"], 1);
    assert_eq!(body["invalid_tokens_removed"], 1);

    let tokens = app.store.list_tokens(user_id).await.unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].token, "fresh-token-1111");
}

#[tokio::test]
async fn test_dispatch_unavailable_without_provider() {
    let app = TestApp::without_dispatcher(test_config());

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/dispatch",
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "service_unavailable");
}

#[tokio::test]
async fn test_dispatch_unavailable_when_push_disabled() {
    let mut config = test_config();
    config.push.enabled = false;
    let app = TestApp::with_provider(config, MockPushProvider::new());

    let (status, _) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/dispatch",
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

// ============================================================================
// Listing and cleanup
// ============================================================================

#[tokio::test]
async fn test_list_recent_honours_limit() {
    let app = TestApp::new();
    for i in 0..3 {
        app.store
            .create(NewNotification::new(
                Uuid::new_v4(),
                format!("Notice {}", i),
                "Body",
            ))
            .await
            .unwrap();
    }

    let (status, body) = app
        .send(admin_request(
            Method::GET,
            "/api/v1/admin/notifications?limit=2",
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_cleanup_single_user() {
    let app = TestApp::new();
    let target = Uuid::new_v4();
    let bystander = Uuid::new_v4();
    for user_id in [target, target, bystander] {
        app.store
            .create(NewNotification::new(user_id, "Notice", "Body"))
            .await
            .unwrap();
    }

    let (status, body) = app
        .send(admin_request(
            Method::POST,
            &format!("/api/v1/admin/notifications/cleanup?user_id={}", target),
            None,
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cleared"], 2);
    assert!(app.store.list_for_user(target).await.unwrap().is_empty());
    assert_eq!(app.store.list_for_user(bystander).await.unwrap().len(), 1);

    // Cleared notifications remain visible to operators.
    assert_eq!(app.store.list_recent(10).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_cleanup_everyone() {
    let app = TestApp::new();
    for _ in 0..2 {
        app.store
            .create(NewNotification::new(Uuid::new_v4(), "Notice", "Body"))
            .await
            .unwrap();
    }

    let (_, body) = app
        .send(admin_request(
            Method::POST,
            "/api/v1/admin/notifications/cleanup",
            None,
        ))
        .await;

    assert_eq!(body["cleared"], 2);
}
