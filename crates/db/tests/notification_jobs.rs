//! Integration tests for the notification outbox.

use assert_matches::assert_matches;
use feedback_db::models::feedback::CreateFeedback;
use feedback_db::models::notification_job::{NotificationHints, NotificationStep};
use feedback_db::models::status::{JobStatus, StepState};
use feedback_db::repositories::{FeedbackRepo, NotificationJobRepo};
use sqlx::PgPool;

const WINDOW_SECS: i64 = 600;
const LEASE_SECS: i64 = 300;

fn new_feedback(comment: &str) -> CreateFeedback {
    CreateFeedback {
        comment: comment.to_string(),
        screenshot_data_id: None,
        timestamp: 0,
        user_agent: None,
        url: None,
        user_name: Some("kim".to_string()),
    }
}

fn hints() -> NotificationHints {
    NotificationHints {
        url: Some("https://app.example/".to_string()),
        github_repository: Some("https://github.com/org/repo".to_string()),
        ..Default::default()
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn enqueue_writes_feedback_and_job(pool: PgPool) {
    let outcome = NotificationJobRepo::enqueue_feedback(&pool, &new_feedback("a"), "key-a", &hints(), WINDOW_SECS)
        .await
        .unwrap();
    assert!(!outcome.duplicate);

    assert!(FeedbackRepo::find_by_id(&pool, outcome.feedback_id).await.unwrap().is_some());
    let job = NotificationJobRepo::find_by_id(&pool, outcome.job_id).await.unwrap().unwrap();
    assert_eq!(job.feedback_id, outcome.feedback_id);
    assert_eq!(job.status(), Some(JobStatus::Pending));
    assert_eq!(job.hints(), hints());
    assert_eq!(job.step_state(NotificationStep::Slack), StepState::Pending);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_within_window_returns_original(pool: PgPool) {
    let first = NotificationJobRepo::enqueue_feedback(&pool, &new_feedback("same"), "dup", &hints(), WINDOW_SECS)
        .await
        .unwrap();
    let second = NotificationJobRepo::enqueue_feedback(&pool, &new_feedback("same"), "dup", &hints(), WINDOW_SECS)
        .await
        .unwrap();

    assert!(second.duplicate);
    assert_eq!(second.feedback_id, first.feedback_id);
    assert_eq!(FeedbackRepo::count(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn zero_window_disables_dedup(pool: PgPool) {
    for _ in 0..2 {
        NotificationJobRepo::enqueue_feedback(&pool, &new_feedback("same"), "dup", &hints(), 0)
            .await
            .unwrap();
    }
    assert_eq!(FeedbackRepo::count(&pool).await.unwrap(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn claimed_job_is_leased(pool: PgPool) {
    let outcome = NotificationJobRepo::enqueue_feedback(&pool, &new_feedback("a"), "k", &hints(), WINDOW_SECS)
        .await
        .unwrap();

    let job = NotificationJobRepo::claim_next(&pool, LEASE_SECS).await.unwrap().unwrap();
    assert_eq!(job.id, outcome.job_id);
    assert_eq!(job.status(), Some(JobStatus::Running));
    assert_eq!(job.attempts, 1);
    assert!(job.locked_until.is_some());

    assert_matches!(NotificationJobRepo::claim_next(&pool, LEASE_SECS).await, Ok(None));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn expired_lease_is_reclaimable_with_settled_steps_kept(pool: PgPool) {
    NotificationJobRepo::enqueue_feedback(&pool, &new_feedback("a"), "k", &hints(), WINDOW_SECS)
        .await
        .unwrap();

    let job = NotificationJobRepo::claim_next(&pool, -1).await.unwrap().unwrap();
    NotificationJobRepo::record_step(
        &pool,
        job.id,
        NotificationStep::GitHub,
        StepState::Succeeded,
        Some("https://github.com/org/repo/issues/1"),
    )
    .await
    .unwrap();

    let reclaimed = NotificationJobRepo::claim_next(&pool, LEASE_SECS).await.unwrap().unwrap();
    assert_eq!(reclaimed.id, job.id);
    assert_eq!(reclaimed.attempts, 2);
    assert_eq!(reclaimed.step_state(NotificationStep::GitHub), StepState::Succeeded);
    assert_eq!(reclaimed.step_state(NotificationStep::Task), StepState::Pending);
    assert_eq!(
        reclaimed.github_issue_url.as_deref(),
        Some("https://github.com/org/repo/issues/1")
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn completed_jobs_are_never_claimed(pool: PgPool) {
    NotificationJobRepo::enqueue_feedback(&pool, &new_feedback("a"), "k", &hints(), WINDOW_SECS)
        .await
        .unwrap();
    let job = NotificationJobRepo::claim_next(&pool, -1).await.unwrap().unwrap();
    NotificationJobRepo::complete(&pool, job.id).await.unwrap();

    assert_matches!(NotificationJobRepo::claim_next(&pool, LEASE_SECS).await, Ok(None));
    let done = NotificationJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(done.status(), Some(JobStatus::Completed));
    assert!(done.completed_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn postponed_job_waits_for_its_delay(pool: PgPool) {
    NotificationJobRepo::enqueue_feedback(&pool, &new_feedback("a"), "k", &hints(), WINDOW_SECS)
        .await
        .unwrap();
    let job = NotificationJobRepo::claim_next(&pool, LEASE_SECS).await.unwrap().unwrap();
    NotificationJobRepo::postpone(&pool, job.id, 60, "feedback load failed")
        .await
        .unwrap();

    assert_matches!(NotificationJobRepo::claim_next(&pool, LEASE_SECS).await, Ok(None));
    let stored = NotificationJobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(stored.status(), Some(JobStatus::Pending));
    assert_eq!(stored.last_error.as_deref(), Some("feedback load failed"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_feedback_removes_its_job(pool: PgPool) {
    let outcome = NotificationJobRepo::enqueue_feedback(&pool, &new_feedback("a"), "k", &hints(), WINDOW_SECS)
        .await
        .unwrap();
    FeedbackRepo::delete(&pool, outcome.feedback_id).await.unwrap();
    assert!(NotificationJobRepo::find_by_id(&pool, outcome.job_id).await.unwrap().is_none());
}
