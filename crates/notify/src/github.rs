//! GitHub issue creation.

use chrono::FixedOffset;
use feedback_core::github_repo::GitHubRepository;
use feedback_core::timestamps::format_millis;
use feedback_db::models::feedback::FeedbackWithScreenshot;
use serde::{Deserialize, Serialize};

use crate::config::GitHubConfig;
use crate::trim_base;

/// Labels applied to every feedback issue.
pub const ISSUE_LABELS: [&str; 2] = ["feedback", "user-report"];

#[derive(Debug, thiserror::Error)]
pub enum GitHubError {
    /// `GITHUB_TOKEN` is not configured.
    #[error("GITHUB_TOKEN environment variable is not set")]
    MissingToken,

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// GitHub answered with a non-2xx status.
    #[error("GitHub API returned HTTP {status}: {message}")]
    Api { status: u16, message: String },
}

/// Request body for `POST /repos/{owner}/{repo}/issues`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueData {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
}

/// The parts of the created issue we keep.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedIssue {
    pub number: i64,
    pub html_url: String,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    message: Option<String>,
}

/// Build the issue for a feedback.
///
/// Page details and the embedded screenshot are only included when a
/// capture is attached; the reporter line only when a name is known.
pub fn issue_data_from_feedback(
    record: &FeedbackWithScreenshot,
    reporter_name: Option<&str>,
    offset: FixedOffset,
) -> IssueData {
    let feedback = &record.feedback;
    let received = format_millis(feedback.timestamp.saturating_mul(1000), offset)
        .unwrap_or_else(|| feedback.timestamp.to_string());

    let title = match &record.screenshot_data {
        Some(shot) => format!("[フィードバック] {}", shot.tab_title),
        None => format!("[エラーレポート] フィードバック #{}", feedback.id),
    };

    let mut body = format!("## フィードバック詳細\n\n**コメント:**\n{}\n", feedback.comment);

    match &record.screenshot_data {
        Some(shot) => {
            body.push_str(&format!(
                "\n**ページ情報:**\n- URL: {}\n- タイトル: {}\n- 受信日時: {received}\n",
                shot.tab_url, shot.tab_title
            ));
            body.push_str(&format!(
                "\n**スクリーンショット:**\n![Screenshot]({})\n",
                shot.screenshot_url
            ));
        }
        None => {
            if let Some(url) = &feedback.url {
                body.push_str(&format!("\n**ページ情報:**\n- URL: {url}\n"));
            }
            body.push_str(&format!("- 受信日時: {received}\n"));
        }
    }

    if let Some(name) = reporter_name.filter(|n| !n.trim().is_empty()) {
        body.push_str(&format!("\n**報告者:** {name}\n"));
    }

    body.push_str(&format!(
        "\n**技術情報:**\n- フィードバックID: {}\n- User Agent: {}\n\n---\n*このissueは自動的にフィードバックシステムから作成されました*",
        feedback.id,
        feedback.user_agent.as_deref().unwrap_or("Unknown"),
    ));

    IssueData {
        title,
        body,
        labels: ISSUE_LABELS.iter().map(|l| l.to_string()).collect(),
    }
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: Option<String>,
    api_url: String,
}

impl GitHubClient {
    pub fn new(client: reqwest::Client, config: &GitHubConfig) -> Self {
        Self {
            client,
            token: config.token.clone(),
            api_url: trim_base(&config.api_url),
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Create an issue in `repo`.
    pub async fn create_issue(
        &self,
        repo: &GitHubRepository,
        issue: &IssueData,
    ) -> Result<CreatedIssue, GitHubError> {
        let token = self.token.as_deref().ok_or(GitHubError::MissingToken)?;

        let response = self
            .client
            .post(format!("{}/repos/{}/{}/issues", self.api_url, repo.owner, repo.repo))
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .json(issue)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<GitHubErrorBody>()
                .await
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(GitHubError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedIssue = response.json().await?;
        tracing::info!(
            repository = %repo.full_name(),
            issue_number = created.number,
            issue_url = %created.html_url,
            "GitHub issue created",
        );
        Ok(created)
    }
}
