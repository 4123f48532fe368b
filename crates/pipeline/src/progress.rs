//! Step outcomes and where they are persisted.

use async_trait::async_trait;
use feedback_db::models::notification_job::NotificationStep;
use feedback_db::models::status::StepState;

/// Boxed error returned by progress sinks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// How a single step settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// `issue_url` is only set by the GitHub step.
    Succeeded { issue_url: Option<String> },
    Failed(String),
    Skipped(String),
}

impl StepOutcome {
    pub fn succeeded() -> Self {
        Self::Succeeded { issue_url: None }
    }

    pub fn state(&self) -> StepState {
        match self {
            Self::Succeeded { .. } => StepState::Succeeded,
            Self::Failed(_) => StepState::Failed,
            Self::Skipped(_) => StepState::Skipped,
        }
    }

    pub fn issue_url(&self) -> Option<&str> {
        match self {
            Self::Succeeded { issue_url } => issue_url.as_deref(),
            _ => None,
        }
    }
}

/// Receives each step outcome as soon as it settles.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn record(&self, step: NotificationStep, outcome: &StepOutcome) -> Result<(), BoxError>;
}

/// Discards progress; for runs that are not backed by a job row.
pub struct DiscardProgress;

#[async_trait]
impl ProgressSink for DiscardProgress {
    async fn record(&self, _step: NotificationStep, _outcome: &StepOutcome) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Record an outcome, logging instead of failing when the sink errors.
pub(crate) async fn record_outcome(
    sink: &dyn ProgressSink,
    feedback_id: i64,
    step: NotificationStep,
    outcome: &StepOutcome,
) {
    if let Err(e) = sink.record(step, outcome).await {
        tracing::error!(
            feedback_id,
            step = step.as_str(),
            state = outcome.state().as_str(),
            error = %e,
            "Failed to persist notification step outcome",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_maps_to_stored_state() {
        assert_eq!(StepOutcome::succeeded().state(), StepState::Succeeded);
        assert_eq!(StepOutcome::Failed("x".into()).state(), StepState::Failed);
        assert_eq!(StepOutcome::Skipped("x".into()).state(), StepState::Skipped);
    }

    #[test]
    fn only_success_carries_issue_url() {
        let ok = StepOutcome::Succeeded {
            issue_url: Some("https://github.com/o/r/issues/1".into()),
        };
        assert_eq!(ok.issue_url(), Some("https://github.com/o/r/issues/1"));
        assert_eq!(StepOutcome::Failed("x".into()).issue_url(), None);
    }
}
