//! Repository for the `notification_jobs` outbox.
//!
//! A job is written in the same transaction as its feedback row, so every
//! committed feedback has exactly one job. Workers claim jobs with a lease;
//! a job whose lease expired (worker crashed mid-run) becomes claimable
//! again and only its unsettled steps are re-run.

use feedback_core::types::DbId;
use sqlx::{PgExecutor, PgPool};

use crate::models::feedback::CreateFeedback;
use crate::models::notification_job::{
    EnqueueOutcome, NotificationHints, NotificationJob, NotificationStep,
};
use crate::models::status::{JobStatus, StepState};
use crate::repositories::FeedbackRepo;

/// Column list for `notification_jobs` queries.
const COLUMNS: &str = "\
    id, feedback_id, dedup_key, status_id, hints, \
    github_state, github_issue_url, task_state, slack_state, \
    attempts, last_error, locked_until, completed_at, created_at, updated_at";

pub struct NotificationJobRepo;

impl NotificationJobRepo {
    /// Persist feedback and its notification job atomically.
    ///
    /// When a job with the same `dedup_key` was created within the last
    /// `dedup_window_secs`, nothing is written and the original feedback ID
    /// is returned with `duplicate = true`. Concurrent submissions with the
    /// same key are serialized by a transaction-scoped advisory lock.
    pub async fn enqueue_feedback(
        pool: &PgPool,
        input: &CreateFeedback,
        dedup_key: &str,
        hints: &NotificationHints,
        dedup_window_secs: i64,
    ) -> Result<EnqueueOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1)::BIGINT)")
            .bind(dedup_key)
            .execute(&mut *tx)
            .await?;

        if dedup_window_secs > 0 {
            if let Some(existing) =
                Self::find_recent_by_dedup_key(&mut *tx, dedup_key, dedup_window_secs).await?
            {
                tx.commit().await?;
                return Ok(EnqueueOutcome {
                    feedback_id: existing.feedback_id,
                    job_id: existing.id,
                    duplicate: true,
                });
            }
        }

        let feedback = FeedbackRepo::insert(&mut *tx, input).await?;
        let job = Self::insert(&mut *tx, feedback.id, dedup_key, hints).await?;

        tx.commit().await?;
        Ok(EnqueueOutcome {
            feedback_id: feedback.id,
            job_id: job.id,
            duplicate: false,
        })
    }

    /// Insert a pending job for an existing feedback row.
    pub async fn insert<'e, E>(
        executor: E,
        feedback_id: DbId,
        dedup_key: &str,
        hints: &NotificationHints,
    ) -> Result<NotificationJob, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let hints = serde_json::to_value(hints).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;
        let query = format!(
            "INSERT INTO notification_jobs (feedback_id, dedup_key, status_id, hints) \
             VALUES ($1, $2, $3, $4) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationJob>(&query)
            .bind(feedback_id)
            .bind(dedup_key)
            .bind(JobStatus::Pending.id())
            .bind(hints)
            .fetch_one(executor)
            .await
    }

    /// Most recent job with this key created within the window.
    pub async fn find_recent_by_dedup_key<'e, E>(
        executor: E,
        dedup_key: &str,
        window_secs: i64,
    ) -> Result<Option<NotificationJob>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_jobs \
             WHERE dedup_key = $1 \
               AND created_at >= NOW() - make_interval(secs => $2::DOUBLE PRECISION) \
             ORDER BY created_at DESC \
             LIMIT 1"
        );
        sqlx::query_as::<_, NotificationJob>(&query)
            .bind(dedup_key)
            .bind(window_secs as f64)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<NotificationJob>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notification_jobs WHERE id = $1");
        sqlx::query_as::<_, NotificationJob>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_feedback_id(
        pool: &PgPool,
        feedback_id: DbId,
    ) -> Result<Option<NotificationJob>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM notification_jobs WHERE feedback_id = $1 \
             ORDER BY created_at DESC LIMIT 1"
        );
        sqlx::query_as::<_, NotificationJob>(&query)
            .bind(feedback_id)
            .fetch_optional(pool)
            .await
    }

    /// Atomically claim the oldest runnable job and lease it.
    ///
    /// Runnable means not completed and not currently leased (never leased,
    /// or the lease has expired). Uses `FOR UPDATE SKIP LOCKED` so several
    /// workers never claim the same job.
    pub async fn claim_next(
        pool: &PgPool,
        lease_secs: i64,
    ) -> Result<Option<NotificationJob>, sqlx::Error> {
        let query = format!(
            "UPDATE notification_jobs \
             SET status_id = $1, \
                 locked_until = NOW() + make_interval(secs => $2::DOUBLE PRECISION), \
                 attempts = attempts + 1 \
             WHERE id = ( \
                 SELECT id FROM notification_jobs \
                 WHERE status_id <> $3 \
                   AND (locked_until IS NULL OR locked_until < NOW()) \
                 ORDER BY created_at ASC \
                 LIMIT 1 \
                 FOR UPDATE SKIP LOCKED \
             ) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, NotificationJob>(&query)
            .bind(JobStatus::Running.id())
            .bind(lease_secs as f64)
            .bind(JobStatus::Completed.id())
            .fetch_optional(pool)
            .await
    }

    /// Persist the outcome of one step. `issue_url` is only stored when given.
    pub async fn record_step(
        pool: &PgPool,
        job_id: DbId,
        step: NotificationStep,
        state: StepState,
        issue_url: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let column = step.state_column();
        let query = format!(
            "UPDATE notification_jobs \
             SET {column} = $2, github_issue_url = COALESCE($3, github_issue_url) \
             WHERE id = $1"
        );
        sqlx::query(&query)
            .bind(job_id)
            .bind(state.id())
            .bind(issue_url)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Mark a job as finished and release its lease.
    pub async fn complete(pool: &PgPool, job_id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notification_jobs \
             SET status_id = $2, completed_at = NOW(), locked_until = NULL \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Completed.id())
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Return a claimed job to the queue, runnable again after `delay_secs`.
    pub async fn postpone(
        pool: &PgPool,
        job_id: DbId,
        delay_secs: i64,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE notification_jobs \
             SET status_id = $2, last_error = $3, \
                 locked_until = NOW() + make_interval(secs => $4::DOUBLE PRECISION) \
             WHERE id = $1",
        )
        .bind(job_id)
        .bind(JobStatus::Pending.id())
        .bind(error)
        .bind(delay_secs as f64)
        .execute(pool)
        .await?;
        Ok(())
    }
}
