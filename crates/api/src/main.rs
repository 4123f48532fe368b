use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use feedback_core::error_log::{ErrorLogBuffer, EvictionPolicy};
use feedback_notify::NotifyConfig;
use feedback_pipeline::{NotificationPipeline, PipelineAdapters, PipelineSettings};
use feedback_storage::{ObjectStore, StorageConfig};
use feedback_worker::{OutboxWorker, WorkerConfig};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use feedback_api::config::ServerConfig;
use feedback_api::router::build_app_router;
use feedback_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "feedback_api=debug,feedback_worker=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;

    let pool = feedback_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connection pool created");

    feedback_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    tracing::info!("Database health check passed");

    feedback_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database migrations applied");

    // --- Storage ---
    let store = Arc::new(ObjectStore::from_config(&StorageConfig::from_env()).await);

    // --- Notification pipeline ---
    let notify_config = NotifyConfig::from_env();
    let pipeline = NotificationPipeline::new(
        PipelineAdapters::from_config(&notify_config),
        PipelineSettings::from_env(),
    );

    // --- Outbox worker ---
    let worker_cancel = CancellationToken::new();
    let (worker_wake, worker_handle) = if config.embedded_worker {
        let worker = OutboxWorker::new(pool.clone(), pipeline.clone(), WorkerConfig::from_env());
        let wake = worker.waker();
        let cancel = worker_cancel.clone();
        let handle = tokio::spawn(async move { worker.run(cancel).await });
        (wake, Some(handle))
    } else {
        tracing::info!("Embedded worker disabled, notifications require a separate feedback-worker");
        (Arc::new(Notify::new()), None)
    };

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        error_logs: Arc::new(Mutex::new(ErrorLogBuffer::new(
            config.error_log_capacity,
            EvictionPolicy::DropOldest,
        ))),
        pipeline,
        store,
        worker_wake,
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let host = config.host.parse().context("Invalid HOST address")?;
    let addr = SocketAddr::new(host, config.port);
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    worker_cancel.cancel();
    if let Some(handle) = worker_handle {
        if tokio::time::timeout(Duration::from_secs(30), handle).await.is_err() {
            tracing::warn!("Outbox worker did not stop in time; leased jobs will be reclaimed");
        }
    }

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
