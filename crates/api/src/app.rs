use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use domain::services::PushDispatcher;
use domain::stores::{DeviceRegistry, InMemoryStore, NotificationStore, PreferenceStore};
use persistence::repositories::{
    DeviceTokenRepository, NotificationPreferenceRepository, NotificationRepository,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::middleware::{metrics_handler, metrics_middleware, require_admin_key, trace_id};
use crate::routes::{admin_notifications, devices, health, notifications, preferences};

/// The three stores behind the HTTP surface and the dispatcher.
#[derive(Clone)]
pub struct Stores {
    pub notifications: Arc<dyn NotificationStore>,
    pub devices: Arc<dyn DeviceRegistry>,
    pub preferences: Arc<dyn PreferenceStore>,
}

impl Stores {
    /// PostgreSQL-backed stores.
    pub fn postgres(pool: &PgPool) -> Self {
        Self {
            notifications: Arc::new(NotificationRepository::new(pool.clone())),
            devices: Arc::new(DeviceTokenRepository::new(pool.clone())),
            preferences: Arc::new(NotificationPreferenceRepository::new(pool.clone())),
        }
    }

    /// All three stores served by one shared in-memory store.
    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            notifications: store.clone(),
            devices: store.clone(),
            preferences: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<Config>,
    pub notifications: Arc<dyn NotificationStore>,
    pub devices: Arc<dyn DeviceRegistry>,
    pub preferences: Arc<dyn PreferenceStore>,
    /// Present when a push provider is configured.
    pub dispatcher: Option<Arc<PushDispatcher>>,
}

impl AppState {
    pub fn new(
        config: Config,
        pool: PgPool,
        stores: Stores,
        dispatcher: Option<Arc<PushDispatcher>>,
    ) -> Self {
        Self {
            pool,
            config: Arc::new(config),
            notifications: stores.notifications,
            devices: stores.devices,
            preferences: stores.preferences,
            dispatcher,
        }
    }

    /// The dispatcher, if push delivery is both configured and enabled.
    pub fn active_dispatcher(&self) -> Option<&Arc<PushDispatcher>> {
        self.dispatcher
            .as_ref()
            .filter(|dispatcher| dispatcher.config().enabled)
    }
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let cors = if config.security.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = config
            .security
            .cors_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // User routes identify the caller through the X-User-Id extractor.
    let user_routes = Router::new()
        .route("/api/v1/devices/register", post(devices::register_device))
        .route("/api/v1/devices", get(devices::list_devices))
        .route("/api/v1/devices/:token", delete(devices::unregister_device))
        .route(
            "/api/v1/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/v1/notifications/:notification_id/read",
            patch(notifications::mark_read),
        )
        .route(
            "/api/v1/notification-preferences",
            get(preferences::get_preferences).patch(preferences::update_preferences),
        );

    let admin_routes = Router::new()
        .route(
            "/api/v1/admin/notifications/send",
            post(admin_notifications::send_notification),
        )
        .route(
            "/api/v1/admin/notifications",
            get(admin_notifications::list_recent),
        )
        .route(
            "/api/v1/admin/notifications/cleanup",
            post(admin_notifications::cleanup),
        )
        .route(
            "/api/v1/admin/notifications/dispatch",
            post(admin_notifications::dispatch_pending),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_admin_key,
        ));

    let public_routes = Router::new()
        .route("/api/health", get(health::health_check))
        .route("/api/health/ready", get(health::ready))
        .route("/api/health/live", get(health::live))
        .route("/metrics", get(metrics_handler));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_routes)
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(trace_id))
        .layer(cors)
        .with_state(state)
}
