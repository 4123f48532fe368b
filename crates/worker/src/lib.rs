//! Outbox consumer for notification jobs.
//!
//! [`OutboxWorker`] polls `notification_jobs` every poll interval, or sooner
//! when woken through [`OutboxWorker::waker`] after an insert. Each claimed
//! job holds a lease; if the process dies mid-run the lease expires and
//! another worker picks the job up, re-running only its unsettled steps.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use feedback_core::settings::parsed_from_env;
use feedback_core::types::DbId;
use feedback_db::models::notification_job::{NotificationJob, NotificationStep};
use feedback_db::repositories::{FeedbackRepo, NotificationJobRepo};
use feedback_pipeline::progress::BoxError;
use feedback_pipeline::{NotificationContext, NotificationPipeline, PriorProgress, ProgressSink, StepOutcome};
use sqlx::PgPool;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_LEASE_SECS: i64 = 300;
/// Delay before a job whose feedback could not be loaded is retried.
pub const RETRY_DELAY_SECS: i64 = 30;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub poll_interval: Duration,
    pub lease_secs: i64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            lease_secs: DEFAULT_LEASE_SECS,
        }
    }
}

impl WorkerConfig {
    /// | Variable                  | Default |
    /// |---------------------------|---------|
    /// | `WORKER_POLL_INTERVAL_MS` | `1000`  |
    /// | `WORKER_LEASE_SECS`       | `300`   |
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_millis(
                parsed_from_env("WORKER_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS).max(1),
            ),
            lease_secs: parsed_from_env("WORKER_LEASE_SECS", DEFAULT_LEASE_SECS).max(1),
        }
    }
}

/// Persists step outcomes onto the job row as they settle.
pub struct JobProgress {
    pool: PgPool,
    job_id: DbId,
}

impl JobProgress {
    pub fn new(pool: PgPool, job_id: DbId) -> Self {
        Self { pool, job_id }
    }
}

#[async_trait]
impl ProgressSink for JobProgress {
    async fn record(&self, step: NotificationStep, outcome: &StepOutcome) -> Result<(), BoxError> {
        NotificationJobRepo::record_step(&self.pool, self.job_id, step, outcome.state(), outcome.issue_url())
            .await?;
        Ok(())
    }
}

pub struct OutboxWorker {
    pool: PgPool,
    pipeline: NotificationPipeline,
    config: WorkerConfig,
    wake: Arc<Notify>,
}

impl OutboxWorker {
    pub fn new(pool: PgPool, pipeline: NotificationPipeline, config: WorkerConfig) -> Self {
        Self {
            pool,
            pipeline,
            config,
            wake: Arc::new(Notify::new()),
        }
    }

    /// Handle for waking the worker right after a job is enqueued.
    pub fn waker(&self) -> Arc<Notify> {
        Arc::clone(&self.wake)
    }

    /// Run until `cancel` is triggered. A job in progress is finished
    /// before the loop exits.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        tracing::info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            lease_secs = self.config.lease_secs,
            "Outbox worker started",
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Outbox worker shutting down");
                    break;
                }
                _ = ticker.tick() => {}
                _ = self.wake.notified() => {}
            }
            if let Err(e) = self.drain(&cancel).await {
                tracing::error!(error = %e, "Outbox poll failed");
            }
        }
    }

    /// Process jobs until none is claimable or `cancel` fires.
    pub async fn drain(&self, cancel: &CancellationToken) -> Result<usize, sqlx::Error> {
        let mut processed = 0;
        while !cancel.is_cancelled() {
            match self.process_next().await? {
                Some(_) => processed += 1,
                None => break,
            }
        }
        Ok(processed)
    }

    /// Claim and process one job. Returns the job ID, or `None` when the
    /// queue is empty.
    pub async fn process_next(&self) -> Result<Option<DbId>, sqlx::Error> {
        let Some(job) = NotificationJobRepo::claim_next(&self.pool, self.config.lease_secs).await? else {
            return Ok(None);
        };
        let job_id = job.id;
        tracing::debug!(job_id, feedback_id = job.feedback_id, attempts = job.attempts, "Claimed notification job");
        self.process(job).await?;
        Ok(Some(job_id))
    }

    async fn process(&self, job: NotificationJob) -> Result<(), sqlx::Error> {
        let record = match FeedbackRepo::find_by_id_with_screenshot(&self.pool, job.feedback_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                tracing::warn!(job_id = job.id, feedback_id = job.feedback_id, "Feedback no longer exists, completing job");
                return NotificationJobRepo::complete(&self.pool, job.id).await;
            }
            Err(e) => {
                tracing::warn!(job_id = job.id, feedback_id = job.feedback_id, error = %e, "Failed to load feedback, postponing job");
                return NotificationJobRepo::postpone(&self.pool, job.id, RETRY_DELAY_SECS, &e.to_string()).await;
            }
        };

        let ctx = Arc::new(NotificationContext::new(record, job.hints()));
        let progress: Arc<dyn ProgressSink> = Arc::new(JobProgress::new(self.pool.clone(), job.id));
        self.pipeline
            .run(ctx, PriorProgress::from_job(&job), progress)
            .await;

        NotificationJobRepo::complete(&self.pool, job.id).await
    }
}
