//! Post-persist notification pipeline.
//!
//! One run handles one feedback:
//!
//! 1. resolve the owning project (page domain, then repository hint);
//! 2. spawn branch A (GitHub issue) and branch B (task) concurrently;
//! 3. send the Slack notification once branch A settles, or after
//!    [`PipelineSettings::slack_issue_wait`] without the issue link;
//! 4. wait for whatever is still running.
//!
//! Every outcome goes to the [`ProgressSink`] as soon as it settles, and
//! steps already settled in an earlier run are not repeated.

use std::sync::Arc;
use std::time::Duration;

use chrono::FixedOffset;
use feedback_core::domain_match::Project;
use feedback_core::error::UNKNOWN_ERROR;
use feedback_core::github_repo::parse_github_repository;
use feedback_core::settings::parsed_from_env;
use feedback_core::timestamps::display_offset;
use feedback_db::models::notification_job::{NotificationJob, NotificationStep};
use feedback_db::models::status::StepState;
use feedback_notify::config::{NotifyConfig, DEFAULT_DISPLAY_UTC_OFFSET_HOURS};
use feedback_notify::github::issue_data_from_feedback;
use feedback_notify::task_server::{task_description, CreateTaskRequest, CreatedTask, TaskContext, TaskServerError};
use feedback_notify::{http_client, GitHubClient, ProjectCatalog, SlackNotifier, Summarizer, TaskServerClient};
use tokio::task::JoinError;

use crate::adapters::{FeedbackNotifier, IssueTracker, ProjectDirectory, TaskTracker, TitleSource};
use crate::context::{resolve_project, NotificationContext, ProjectResolution};
use crate::progress::{record_outcome, ProgressSink, StepOutcome};

/// Default cap on how long Slack waits for the GitHub branch.
pub const DEFAULT_SLACK_ISSUE_WAIT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub slack_issue_wait: Duration,
    pub display_offset: FixedOffset,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            slack_issue_wait: Duration::from_secs(DEFAULT_SLACK_ISSUE_WAIT_SECS),
            display_offset: display_offset(DEFAULT_DISPLAY_UTC_OFFSET_HOURS),
        }
    }
}

impl PipelineSettings {
    /// | Variable                   | Default |
    /// |----------------------------|---------|
    /// | `SLACK_ISSUE_WAIT_SECS`    | `30`    |
    /// | `DISPLAY_UTC_OFFSET_HOURS` | `9`     |
    pub fn from_env() -> Self {
        Self {
            slack_issue_wait: Duration::from_secs(parsed_from_env(
                "SLACK_ISSUE_WAIT_SECS",
                DEFAULT_SLACK_ISSUE_WAIT_SECS,
            )),
            display_offset: display_offset(parsed_from_env(
                "DISPLAY_UTC_OFFSET_HOURS",
                DEFAULT_DISPLAY_UTC_OFFSET_HOURS,
            )),
        }
    }
}

/// The outbound services a pipeline talks to.
#[derive(Clone)]
pub struct PipelineAdapters {
    pub projects: Arc<dyn ProjectDirectory>,
    pub issues: Arc<dyn IssueTracker>,
    pub tasks: Arc<dyn TaskTracker>,
    pub titles: Arc<dyn TitleSource>,
    pub notifier: Arc<dyn FeedbackNotifier>,
}

impl PipelineAdapters {
    /// Build the HTTP-backed adapters sharing one client.
    pub fn from_config(config: &NotifyConfig) -> Self {
        let client = http_client();
        Self {
            projects: Arc::new(ProjectCatalog::new(client.clone(), &config.catalog)),
            issues: Arc::new(GitHubClient::new(client.clone(), &config.github)),
            tasks: Arc::new(TaskServerClient::new(client.clone(), &config.task_server)),
            titles: Arc::new(Summarizer::new(client.clone(), &config.summarizer)),
            notifier: Arc::new(SlackNotifier::new(client, &config.slack, config.display_offset)),
        }
    }
}

/// Step states carried over from an earlier run of the same job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorProgress {
    pub github: StepState,
    pub task: StepState,
    pub slack: StepState,
    pub github_issue_url: Option<String>,
}

impl PriorProgress {
    /// Nothing has run yet.
    pub fn fresh() -> Self {
        Self {
            github: StepState::Pending,
            task: StepState::Pending,
            slack: StepState::Pending,
            github_issue_url: None,
        }
    }

    pub fn from_job(job: &NotificationJob) -> Self {
        Self {
            github: job.step_state(NotificationStep::GitHub),
            task: job.step_state(NotificationStep::Task),
            slack: job.step_state(NotificationStep::Slack),
            github_issue_url: job.github_issue_url.clone(),
        }
    }
}

/// Outcomes of the steps this run executed; `None` means the step was
/// already settled and did not run.
#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub github: Option<StepOutcome>,
    pub task: Option<StepOutcome>,
    pub slack: Option<StepOutcome>,
}

#[derive(Clone)]
pub struct NotificationPipeline {
    adapters: PipelineAdapters,
    settings: PipelineSettings,
}

impl NotificationPipeline {
    pub fn new(adapters: PipelineAdapters, settings: PipelineSettings) -> Self {
        Self { adapters, settings }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn tasks_configured(&self) -> bool {
        self.adapters.tasks.is_configured()
    }

    /// Run every unsettled step for `ctx`.
    pub async fn run(
        &self,
        ctx: Arc<NotificationContext>,
        prior: PriorProgress,
        progress: Arc<dyn ProgressSink>,
    ) -> PipelineReport {
        let feedback_id = ctx.feedback_id();
        let needs_github = !prior.github.is_settled();
        let needs_task = !prior.task.is_settled();
        let needs_slack = !prior.slack.is_settled();

        tracing::debug!(
            feedback_id,
            github = prior.github.as_str(),
            task = prior.task.as_str(),
            slack = prior.slack.as_str(),
            "Starting notification pipeline",
        );

        let resolution = if needs_github || needs_slack {
            resolve_project(&ctx, self.adapters.projects.as_ref()).await
        } else {
            ProjectResolution::NotFound
        };

        let mut github_handle = needs_github.then(|| {
            let ctx = Arc::clone(&ctx);
            let progress = Arc::clone(&progress);
            let issues = Arc::clone(&self.adapters.issues);
            let notifier = Arc::clone(&self.adapters.notifier);
            let resolution = resolution.clone();
            let offset = self.settings.display_offset;
            tokio::spawn(async move {
                let outcome =
                    github_branch(&ctx, resolution, issues.as_ref(), notifier.as_ref(), offset).await;
                record_outcome(progress.as_ref(), ctx.feedback_id(), NotificationStep::GitHub, &outcome)
                    .await;
                outcome
            })
        });

        let task_handle = needs_task.then(|| {
            let ctx = Arc::clone(&ctx);
            let progress = Arc::clone(&progress);
            let pipeline = self.clone();
            let repository = resolution
                .project()
                .and_then(|p| p.github_repository.clone());
            tokio::spawn(async move {
                let outcome = pipeline.task_branch(&ctx, repository.as_deref()).await;
                record_outcome(progress.as_ref(), ctx.feedback_id(), NotificationStep::Task, &outcome)
                    .await;
                outcome
            })
        });

        let mut report = PipelineReport::default();

        if needs_slack {
            let issue_url = match github_handle.as_mut() {
                Some(handle) => {
                    match tokio::time::timeout(self.settings.slack_issue_wait, handle).await {
                        Ok(joined) => {
                            let outcome =
                                settle(joined, &ctx, NotificationStep::GitHub, progress.as_ref()).await;
                            let url = outcome.issue_url().map(str::to_string);
                            report.github = Some(outcome);
                            url
                        }
                        Err(_) => {
                            tracing::warn!(
                                feedback_id,
                                wait_secs = self.settings.slack_issue_wait.as_secs(),
                                "GitHub issue still pending, notifying Slack without it",
                            );
                            None
                        }
                    }
                }
                None => prior.github_issue_url.clone(),
            };
            if report.github.is_some() {
                github_handle = None;
            }

            let outcome = slack_step(
                &ctx,
                resolution.project(),
                issue_url,
                self.adapters.notifier.as_ref(),
            )
            .await;
            record_outcome(progress.as_ref(), feedback_id, NotificationStep::Slack, &outcome).await;
            report.slack = Some(outcome);
        }

        if let Some(handle) = github_handle {
            report.github =
                Some(settle(handle.await, &ctx, NotificationStep::GitHub, progress.as_ref()).await);
        }
        if let Some(handle) = task_handle {
            report.task =
                Some(settle(handle.await, &ctx, NotificationStep::Task, progress.as_ref()).await);
        }

        tracing::info!(
            feedback_id,
            github = report.github.as_ref().map(|o| o.state().as_str()),
            task = report.task.as_ref().map(|o| o.state().as_str()),
            slack = report.slack.as_ref().map(|o| o.state().as_str()),
            "Notification pipeline finished",
        );
        report
    }

    /// Summarise the comment and create a task.
    pub async fn create_task(
        &self,
        ctx: &NotificationContext,
        repository: Option<&str>,
    ) -> Result<CreatedTask, TaskServerError> {
        let title = self.adapters.titles.title_for(&ctx.record.feedback.comment).await;
        let description = task_description(
            &ctx.record,
            TaskContext {
                error_details: ctx.hints.error_details.as_ref(),
                github_repository: repository.or(ctx.repository_hint()),
                reporter_name: ctx.reporter_name(),
            },
            self.settings.display_offset,
        );
        self.adapters
            .tasks
            .create_task(&CreateTaskRequest::new(title, description))
            .await
    }

    async fn task_branch(&self, ctx: &NotificationContext, repository: Option<&str>) -> StepOutcome {
        let feedback_id = ctx.feedback_id();
        if !self.adapters.tasks.is_configured() {
            tracing::debug!(feedback_id, "Task server not configured, skipping task creation");
            return StepOutcome::Skipped("task server not configured".into());
        }
        match self.create_task(ctx, repository).await {
            Ok(task) => {
                tracing::info!(feedback_id, task_id = task.task_id, task_url = %task.task_url, "Task created for feedback");
                StepOutcome::succeeded()
            }
            Err(e) => {
                tracing::error!(feedback_id, error = %e, "Task creation failed");
                StepOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Branch A: resolve the repository and open an issue. Failures after a
/// project was found raise a Slack alert; lookups that find nothing skip.
async fn github_branch(
    ctx: &NotificationContext,
    resolution: ProjectResolution,
    issues: &dyn IssueTracker,
    notifier: &dyn FeedbackNotifier,
    offset: FixedOffset,
) -> StepOutcome {
    let feedback_id = ctx.feedback_id();
    let project = match resolution {
        ProjectResolution::Found(project) => project,
        ProjectResolution::NoLocator => {
            tracing::info!(feedback_id, "No page URL or repository hint, skipping GitHub issue");
            return StepOutcome::Skipped("no page URL or repository hint".into());
        }
        ProjectResolution::NotFound => {
            tracing::info!(feedback_id, url = ?ctx.page_url(), "No matching project, skipping GitHub issue");
            return StepOutcome::Skipped("no matching project".into());
        }
        ProjectResolution::Unavailable(error) => {
            tracing::warn!(feedback_id, error = %error, "Project catalog unavailable, skipping GitHub issue");
            return StepOutcome::Skipped(format!("project catalog unavailable: {error}"));
        }
    };

    let repo_url = project
        .github_repository
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let result = match repo_url {
        None => Err("project has no GitHub repository configured".to_string()),
        Some(url) => match parse_github_repository(url) {
            None => Err(format!("invalid GitHub repository URL: {url}")),
            Some(repo) => {
                let issue = issue_data_from_feedback(&ctx.record, ctx.reporter_name(), offset);
                issues.create_issue(&repo, &issue).await.map_err(|e| e.to_string())
            }
        },
    };

    match result {
        Ok(created) => StepOutcome::Succeeded {
            issue_url: Some(created.html_url),
        },
        Err(error) => {
            tracing::error!(
                feedback_id,
                project = %project.name,
                repository = ?repo_url,
                error = %error,
                "GitHub issue creation failed",
            );
            if notifier.is_enabled() {
                if let Err(e) = notifier
                    .notify_github_issue_failed(feedback_id, &error, Some(project.label()), repo_url)
                    .await
                {
                    tracing::warn!(feedback_id, error = %e, "Failed to send GitHub failure alert");
                }
            }
            StepOutcome::Failed(error)
        }
    }
}

async fn slack_step(
    ctx: &NotificationContext,
    project: Option<&Project>,
    issue_url: Option<String>,
    notifier: &dyn FeedbackNotifier,
) -> StepOutcome {
    let feedback_id = ctx.feedback_id();
    if !notifier.is_enabled() {
        tracing::debug!(feedback_id, "Slack not configured, skipping notification");
        return StepOutcome::Skipped("Slack not configured".into());
    }
    match notifier.notify_feedback_received(&ctx.notice(project, issue_url)).await {
        Ok(()) => {
            tracing::info!(feedback_id, "Slack notification sent");
            StepOutcome::succeeded()
        }
        Err(e) => {
            tracing::warn!(feedback_id, error = %e, "Slack notification failed");
            StepOutcome::Failed(e.to_string())
        }
    }
}

/// Unwrap a branch result. A panicked branch never reached its own
/// `record`, so its failure is recorded here.
async fn settle(
    joined: Result<StepOutcome, JoinError>,
    ctx: &NotificationContext,
    step: NotificationStep,
    progress: &dyn ProgressSink,
) -> StepOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(feedback_id = ctx.feedback_id(), step = step.as_str(), error = %e, "Notification branch aborted");
            let outcome = StepOutcome::Failed(UNKNOWN_ERROR.to_string());
            record_outcome(progress, ctx.feedback_id(), step, &outcome).await;
            outcome
        }
    }
}
