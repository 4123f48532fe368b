//! Task creation on the external task tracker.

use chrono::FixedOffset;
use feedback_core::error::UNKNOWN_ERROR;
use feedback_core::ingest::ErrorDetails;
use feedback_core::timestamps::format_millis;
use feedback_db::models::feedback::FeedbackWithScreenshot;
use serde::{Deserialize, Serialize};

use crate::config::TaskServerConfig;
use crate::trim_base;

/// Tags attached to every created task.
pub const TASK_TAGS: [&str; 2] = ["フィードバック", "自動作成"];

/// Default estimate in minutes.
pub const DEFAULT_ESTIMATED_MINUTES: i32 = 60;

const UNKNOWN_PAGE_URL: &str = "URL不明";
const UNKNOWN_PAGE_TITLE: &str = "ページタイトル不明";

#[derive(Debug, thiserror::Error)]
pub enum TaskServerError {
    /// `TASK_SERVER_API_KEY` is not configured.
    #[error("Task server API key is not configured")]
    NotConfigured,

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx status, or an application-level `success: false`.
    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: String,
    pub status: String,
    pub tags: Vec<String>,
    pub estimated_minutes: i32,
}

impl CreateTaskRequest {
    pub fn new(title: String, description: String) -> Self {
        Self {
            title,
            description,
            status: "TODO".to_string(),
            tags: TASK_TAGS.iter().map(|t| t.to_string()).collect(),
            estimated_minutes: DEFAULT_ESTIMATED_MINUTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedTask {
    pub task_id: i64,
    pub task_url: String,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    #[serde(default)]
    success: bool,
    data: Option<TaskData>,
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TaskData {
    id: i64,
}

/// Optional context appended to the task description.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskContext<'a> {
    pub error_details: Option<&'a ErrorDetails>,
    pub github_repository: Option<&'a str>,
    pub reporter_name: Option<&'a str>,
}

/// Markdown description for a task created from a feedback.
pub fn task_description(
    record: &FeedbackWithScreenshot,
    context: TaskContext<'_>,
    offset: FixedOffset,
) -> String {
    let feedback = &record.feedback;
    let shot = record.screenshot_data.as_ref();

    let tab_url = shot
        .map(|s| s.tab_url.as_str())
        .filter(|u| !u.is_empty())
        .or(feedback.url.as_deref())
        .unwrap_or(UNKNOWN_PAGE_URL);
    let tab_title = shot
        .map(|s| s.tab_title.as_str())
        .filter(|t| !t.is_empty())
        .unwrap_or(UNKNOWN_PAGE_TITLE);

    let mut out = format!(
        "## フィードバック内容\n{}\n\n## ページ情報\n- URL: {tab_url}\n- タイトル: {tab_title}\n",
        feedback.comment
    );
    if let Some(url) = shot.map(|s| s.screenshot_url.as_str()).filter(|u| !u.is_empty()) {
        out.push_str(&format!("- スクリーンショット: {url}\n"));
    }

    if let Some(name) = context.reporter_name.filter(|n| !n.trim().is_empty()) {
        out.push_str(&format!("\n## 報告者\n{name}\n"));
    }

    if let Some(details) = context.error_details {
        out.push_str("\n## エラー詳細\n");
        if let Some(source) = &details.source {
            out.push_str(&format!("- ソース: {source}\n"));
        }
        if let Some(page_url) = &details.page_url {
            out.push_str(&format!("- ページURL: {page_url}\n"));
        }
        if let Some(user_agent) = &details.user_agent {
            out.push_str(&format!("- User Agent: {user_agent}\n"));
        }
        if let Some(stack) = &details.stack {
            out.push_str(&format!("\n```\n{stack}\n```\n"));
        }
        if let Some(extra) = details.extra_json() {
            out.push_str(&format!("\n```json\n{extra}\n```\n"));
        }
    }

    if let Some(repo) = context.github_repository.filter(|r| !r.trim().is_empty()) {
        out.push_str(&format!("\n## GitHubリポジトリ\n{repo}\n"));
    }

    let received = format_millis(feedback.timestamp.saturating_mul(1000), offset)
        .unwrap_or_else(|| feedback.timestamp.to_string());
    out.push_str(&format!(
        "\n## 受信日時\n{received}\n\n---\n*このタスクは自動的に作成されました*"
    ));
    out
}

pub struct TaskServerClient {
    client: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
}

impl TaskServerClient {
    pub fn new(client: reqwest::Client, config: &TaskServerConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            base_url: trim_base(&config.base_url),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn task_url(&self, task_id: i64) -> String {
        format!("{}/tasks/{task_id}", self.base_url)
    }

    pub async fn create_task(&self, request: &CreateTaskRequest) -> Result<CreatedTask, TaskServerError> {
        let api_key = self.api_key.as_deref().ok_or(TaskServerError::NotConfigured)?;

        tracing::debug!(title = %request.title, "Creating task");
        let response = self
            .client
            .post(format!("{}/api/external/tasks", self.base_url))
            .header("X-API-Key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body: Option<TaskResponse> = response.json().await.ok();

        if !status.is_success() {
            let message = body
                .and_then(|b| b.error.or(b.message))
                .unwrap_or_else(|| format!("HTTPエラー: {}", status.as_u16()));
            return Err(TaskServerError::Rejected(message));
        }

        match body {
            Some(TaskResponse {
                success: true,
                data: Some(data),
                ..
            }) => {
                let created = CreatedTask {
                    task_id: data.id,
                    task_url: self.task_url(data.id),
                };
                tracing::info!(task_id = created.task_id, task_url = %created.task_url, "Task created");
                Ok(created)
            }
            Some(b) => Err(TaskServerError::Rejected(
                b.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            )),
            None => Err(TaskServerError::Rejected(UNKNOWN_ERROR.to_string())),
        }
    }
}
