//! Outbox job models.

use feedback_core::ingest::ErrorDetails;
use feedback_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::{JobStatus, StatusId, StepState};

/// A row from the `notification_jobs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationJob {
    pub id: DbId,
    pub feedback_id: DbId,
    pub dedup_key: String,
    pub status_id: StatusId,
    pub hints: serde_json::Value,
    pub github_state: StatusId,
    pub github_issue_url: Option<String>,
    pub task_state: StatusId,
    pub slack_state: StatusId,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub locked_until: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationJob {
    pub fn status(&self) -> Option<JobStatus> {
        JobStatus::from_id(self.status_id)
    }

    /// Stored state of one step. Unknown IDs read as pending.
    pub fn step_state(&self, step: NotificationStep) -> StepState {
        let id = match step {
            NotificationStep::GitHub => self.github_state,
            NotificationStep::Task => self.task_state,
            NotificationStep::Slack => self.slack_state,
        };
        StepState::from_id(id).unwrap_or(StepState::Pending)
    }

    /// Decode the stored hints, tolerating rows written with fewer fields.
    pub fn hints(&self) -> NotificationHints {
        match serde_json::from_value(self.hints.clone()) {
            Ok(hints) => hints,
            Err(e) => {
                tracing::warn!(job_id = self.id, error = %e, "Unreadable job hints, using defaults");
                NotificationHints::default()
            }
        }
    }
}

/// Request-time context the notification steps need beyond the feedback row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationHints {
    pub url: Option<String>,
    pub github_repository: Option<String>,
    pub error_details: Option<ErrorDetails>,
    pub user_name: Option<String>,
}

/// The three side effects tracked per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationStep {
    GitHub,
    Task,
    Slack,
}

impl NotificationStep {
    pub(crate) fn state_column(self) -> &'static str {
        match self {
            Self::GitHub => "github_state",
            Self::Task => "task_state",
            Self::Slack => "slack_state",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Task => "task",
            Self::Slack => "slack",
        }
    }
}

/// Result of an ingestion attempt through the outbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueueOutcome {
    pub feedback_id: DbId,
    pub job_id: DbId,
    /// `true` when an identical submission inside the dedup window was found
    /// and nothing new was written.
    pub duplicate: bool,
}
