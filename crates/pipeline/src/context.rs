//! Everything one pipeline run knows about its feedback.

use feedback_core::domain_match::Project;
use feedback_core::ingest::{resolve_page_url, url_or_placeholder};
use feedback_core::timestamps::TimestampInput;
use feedback_db::models::feedback::FeedbackWithScreenshot;
use feedback_db::models::notification_job::NotificationHints;
use feedback_notify::slack::FeedbackNotice;

use crate::adapters::ProjectDirectory;

const UNKNOWN_USER_AGENT: &str = "Unknown";

/// A committed feedback plus the request-time hints stored with its job.
#[derive(Debug, Clone)]
pub struct NotificationContext {
    pub record: FeedbackWithScreenshot,
    pub hints: NotificationHints,
}

impl NotificationContext {
    pub fn new(record: FeedbackWithScreenshot, hints: NotificationHints) -> Self {
        Self { record, hints }
    }

    pub fn feedback_id(&self) -> i64 {
        self.record.feedback.id
    }

    /// Page URL: request `url`, then the capture's tab URL, then the error
    /// report's page URL.
    pub fn page_url(&self) -> Option<&str> {
        let request_url = self.hints.url.as_deref().or(self.record.feedback.url.as_deref());
        resolve_page_url(
            request_url,
            self.record.screenshot_data.as_ref().map(|s| s.tab_url.as_str()),
            self.hints.error_details.as_ref(),
        )
    }

    pub fn repository_hint(&self) -> Option<&str> {
        self.hints
            .github_repository
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty())
    }

    pub fn reporter_name(&self) -> Option<&str> {
        self.hints
            .user_name
            .as_deref()
            .or(self.record.feedback.user_name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    /// Slack payload for this feedback.
    pub fn notice(&self, project: Option<&Project>, issue_url: Option<String>) -> FeedbackNotice {
        let feedback = &self.record.feedback;
        let shot = self.record.screenshot_data.as_ref();
        FeedbackNotice {
            id: feedback.id.to_string(),
            comment: feedback.comment.clone(),
            tab_url: url_or_placeholder(self.page_url()).to_string(),
            tab_title: shot.map(|s| s.tab_title.clone()).unwrap_or_default(),
            timestamp: TimestampInput::from(feedback.timestamp),
            user_agent: feedback
                .user_agent
                .clone()
                .unwrap_or_else(|| UNKNOWN_USER_AGENT.to_string()),
            screenshot_url: shot.map(|s| s.screenshot_url.clone()),
            github_issue_url: issue_url,
            github_repository: project
                .and_then(|p| p.github_repository.clone())
                .or_else(|| self.repository_hint().map(str::to_string)),
            project_name: project.map(|p| p.label().to_string()),
            reporter_name: self.reporter_name().map(str::to_string),
        }
    }
}

/// Outcome of looking up the owning project.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectResolution {
    Found(Project),
    /// Neither a page URL nor a repository hint to look up.
    NoLocator,
    NotFound,
    /// The catalog could not be queried.
    Unavailable(String),
}

impl ProjectResolution {
    pub fn project(&self) -> Option<&Project> {
        match self {
            Self::Found(project) => Some(project),
            _ => None,
        }
    }
}

/// Resolve the project: by page domain first, then by repository hint.
pub async fn resolve_project(
    ctx: &NotificationContext,
    directory: &dyn ProjectDirectory,
) -> ProjectResolution {
    let url = ctx.page_url();
    let hint = ctx.repository_hint();
    if url.is_none() && hint.is_none() {
        return ProjectResolution::NoLocator;
    }

    let mut unavailable = None;

    if let Some(url) = url {
        match directory.project_by_url(url).await {
            Ok(Some(project)) => return ProjectResolution::Found(project),
            Ok(None) => {}
            Err(e) => unavailable = Some(e.to_string()),
        }
    }

    if let Some(hint) = hint {
        match directory.project_by_repository(hint).await {
            Ok(Some(project)) => return ProjectResolution::Found(project),
            Ok(None) => {}
            Err(e) => unavailable = Some(e.to_string()),
        }
    }

    match unavailable {
        Some(error) => ProjectResolution::Unavailable(error),
        None => ProjectResolution::NotFound,
    }
}
