//! Seams between the pipeline and the outbound services.
//!
//! The production implementations are the `feedback-notify` clients; tests
//! substitute in-memory fakes.

use async_trait::async_trait;
use feedback_core::domain_match::Project;
use feedback_core::github_repo::GitHubRepository;
use feedback_notify::github::{CreatedIssue, GitHubClient, GitHubError, IssueData};
use feedback_notify::projects::{CatalogError, ProjectCatalog};
use feedback_notify::slack::{FeedbackNotice, SlackError, SlackNotifier};
use feedback_notify::summarizer::Summarizer;
use feedback_notify::task_server::{CreateTaskRequest, CreatedTask, TaskServerClient, TaskServerError};

#[async_trait]
pub trait ProjectDirectory: Send + Sync {
    async fn project_by_url(&self, url: &str) -> Result<Option<Project>, CatalogError>;
    async fn project_by_repository(&self, hint: &str) -> Result<Option<Project>, CatalogError>;
}

#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn create_issue(
        &self,
        repo: &GitHubRepository,
        issue: &IssueData,
    ) -> Result<CreatedIssue, GitHubError>;
}

#[async_trait]
pub trait TaskTracker: Send + Sync {
    fn is_configured(&self) -> bool;
    async fn create_task(&self, request: &CreateTaskRequest) -> Result<CreatedTask, TaskServerError>;
}

#[async_trait]
pub trait TitleSource: Send + Sync {
    /// Never fails; implementations fall back to a local title.
    async fn title_for(&self, comment: &str) -> String;
}

#[async_trait]
pub trait FeedbackNotifier: Send + Sync {
    fn is_enabled(&self) -> bool;
    async fn notify_feedback_received(&self, notice: &FeedbackNotice) -> Result<(), SlackError>;
    async fn notify_github_issue_failed(
        &self,
        feedback_id: i64,
        error: &str,
        project_name: Option<&str>,
        repo_url: Option<&str>,
    ) -> Result<(), SlackError>;
}

// ---------------------------------------------------------------------------
// feedback-notify implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl ProjectDirectory for ProjectCatalog {
    async fn project_by_url(&self, url: &str) -> Result<Option<Project>, CatalogError> {
        self.find_project_by_url(url).await
    }

    async fn project_by_repository(&self, hint: &str) -> Result<Option<Project>, CatalogError> {
        self.find_project_by_repository(hint).await
    }
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn create_issue(
        &self,
        repo: &GitHubRepository,
        issue: &IssueData,
    ) -> Result<CreatedIssue, GitHubError> {
        GitHubClient::create_issue(self, repo, issue).await
    }
}

#[async_trait]
impl TaskTracker for TaskServerClient {
    fn is_configured(&self) -> bool {
        TaskServerClient::is_configured(self)
    }

    async fn create_task(&self, request: &CreateTaskRequest) -> Result<CreatedTask, TaskServerError> {
        TaskServerClient::create_task(self, request).await
    }
}

#[async_trait]
impl TitleSource for Summarizer {
    async fn title_for(&self, comment: &str) -> String {
        Summarizer::title_for(self, comment).await
    }
}

#[async_trait]
impl FeedbackNotifier for SlackNotifier {
    fn is_enabled(&self) -> bool {
        SlackNotifier::is_enabled(self)
    }

    async fn notify_feedback_received(&self, notice: &FeedbackNotice) -> Result<(), SlackError> {
        SlackNotifier::notify_feedback_received(self, notice).await
    }

    async fn notify_github_issue_failed(
        &self,
        feedback_id: i64,
        error: &str,
        project_name: Option<&str>,
        repo_url: Option<&str>,
    ) -> Result<(), SlackError> {
        SlackNotifier::notify_github_issue_failed(self, feedback_id, error, project_name, repo_url).await
    }
}
