//! Standalone outbox worker.
//!
//! Runs the same loop the API embeds when `EMBEDDED_WORKER=true`; deploy
//! this binary instead to process notifications out of the API process.

use anyhow::Context;
use feedback_notify::NotifyConfig;
use feedback_pipeline::{NotificationPipeline, PipelineAdapters, PipelineSettings};
use feedback_worker::{OutboxWorker, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let registry = tracing_subscriber::registry().with(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "feedback_worker=debug,feedback_pipeline=debug".into()),
    );
    if std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let pool = feedback_db::create_pool(&database_url)
        .await
        .context("Failed to connect to database")?;
    feedback_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    feedback_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let notify_config = NotifyConfig::from_env();
    let pipeline = NotificationPipeline::new(
        PipelineAdapters::from_config(&notify_config),
        PipelineSettings::from_env(),
    );
    let worker = OutboxWorker::new(pool, pipeline, WorkerConfig::from_env());

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received SIGINT (Ctrl-C), stopping worker");
        }
        signal_cancel.cancel();
    });

    worker.run(cancel).await;
    tracing::info!("Worker stopped");
    Ok(())
}
