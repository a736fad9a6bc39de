use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use benefit_notifier_api::{
    app::{create_app, AppState, Stores},
    config::{Config, FcmConfig},
    jobs::{JobScheduler, PoolMetricsJob, PushDispatchJob},
    middleware,
    services::FcmPushProvider,
};
use domain::services::{DispatchConfig, PushDispatcher};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::load().context("Failed to load configuration")?;

    middleware::logging::init_logging(&config.logging);
    middleware::init_metrics().context("Failed to install Prometheus recorder")?;

    info!(
        "Starting benefit notification service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_config: persistence::db::DatabaseConfig = (&config.database).into();
    let pool = persistence::db::create_pool(&db_config)
        .await
        .context("Failed to connect to database")?;

    info!("Running database migrations...");
    sqlx::migrate!("../persistence/src/migrations")
        .run(&pool)
        .await?;
    info!("Migrations completed");

    let stores = Stores::postgres(&pool);
    let dispatcher = build_dispatcher(&config.fcm, (&config.push).into(), &stores)?;

    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    match &dispatcher {
        Some(dispatcher) if config.push.enabled => {
            scheduler.register(PushDispatchJob::new(
                Arc::clone(dispatcher),
                Duration::from_secs(config.push.interval_secs),
            ));
        }
        _ => info!("Push dispatch job not scheduled"),
    }
    scheduler.start();

    let addr = config.socket_addr().context("Invalid server address")?;
    let app = create_app(AppState::new(config, pool, stores, dispatcher));

    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown(Duration::from_secs(30)).await;
    info!("Shutdown complete");

    Ok(())
}

/// Build the push dispatcher when FCM is configured.
fn build_dispatcher(
    fcm: &FcmConfig,
    dispatch: DispatchConfig,
    stores: &Stores,
) -> Result<Option<Arc<PushDispatcher>>> {
    if !fcm.enabled {
        warn!("FCM disabled; notifications stay pending until a provider is configured");
        return Ok(None);
    }

    let provider = FcmPushProvider::new(fcm.clone()).context("Failed to initialize FCM")?;
    info!(project_id = %fcm.project_id, "FCM push provider initialized");

    Ok(Some(Arc::new(PushDispatcher::new(
        Arc::clone(&stores.notifications),
        Arc::clone(&stores.devices),
        Arc::new(provider),
        dispatch,
    ))))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
