//! Slack notifications.
//!
//! Two transports are supported. Bot mode posts through
//! `chat.postMessage` and gets back a message `ts` usable for threading;
//! webhook mode posts to a fixed incoming-webhook URL with no threading, but
//! still sends the title and detail as two sequential posts. Bot mode wins
//! when both are configured.

use chrono::{FixedOffset, Utc};
use feedback_core::timestamps::{format_display, format_timestamp, TimestampInput};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::SlackConfig;
use crate::trim_base;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    /// Neither a bot token nor a webhook URL is configured.
    #[error("Slack is not configured")]
    NotConfigured,

    /// The underlying HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Slack returned a non-2xx status code.
    #[error("Slack returned HTTP {0}")]
    HttpStatus(u16),

    /// The Web API answered `ok: false`.
    #[error("Slack API error: {0}")]
    Api(String),

    /// A bot-mode post succeeded but carried no `ts` to thread under.
    #[error("Slack response carried no message timestamp")]
    MissingHandle,
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// A Slack message payload (`chat.postMessage` / webhook body).
#[derive(Debug, Clone, Serialize)]
pub struct SlackMessage {
    pub channel: String,
    pub text: String,
    pub blocks: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_ts: Option<String>,
}

/// Handle to a posted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageHandle {
    /// Bot mode: the message `ts`, used as `thread_ts` for replies.
    Thread(String),
    /// Webhook mode: accepted, but no reply threading is possible.
    Webhook,
}

impl MessageHandle {
    pub fn thread_ts(&self) -> Option<&str> {
        match self {
            Self::Thread(ts) => Some(ts),
            Self::Webhook => None,
        }
    }
}

/// Everything the feedback notification shows.
#[derive(Debug, Clone)]
pub struct FeedbackNotice {
    pub id: String,
    pub comment: String,
    pub tab_url: String,
    pub tab_title: String,
    pub timestamp: TimestampInput,
    pub user_agent: String,
    pub screenshot_url: Option<String>,
    pub github_issue_url: Option<String>,
    pub github_repository: Option<String>,
    pub project_name: Option<String>,
    pub reporter_name: Option<String>,
}

/// `[FB]{project} ({reporter})` with generic fallbacks.
pub fn title_text(notice: &FeedbackNotice) -> String {
    format!(
        "[FB]{} ({})",
        notice.project_name.as_deref().unwrap_or("プロジェクト"),
        notice.reporter_name.as_deref().unwrap_or("匿名"),
    )
}

/// Thread parent: header plus page link.
pub fn title_message(channel: &str, notice: &FeedbackNotice) -> SlackMessage {
    let title = title_text(notice);
    SlackMessage {
        channel: channel.to_string(),
        text: title.clone(),
        blocks: vec![
            json!({
                "type": "header",
                "text": { "type": "plain_text", "text": title }
            }),
            json!({
                "type": "section",
                "text": {
                    "type": "mrkdwn",
                    "text": format!("*{}*\n<{}|{}>", notice.tab_title, notice.tab_url, notice.tab_url)
                }
            }),
        ],
        thread_ts: None,
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Thread reply with the full feedback details.
pub fn detail_message(
    channel: &str,
    notice: &FeedbackNotice,
    thread_ts: Option<&str>,
    offset: FixedOffset,
) -> SlackMessage {
    let submitted = format_display(&notice.timestamp, offset);

    let mut blocks = vec![
        json!({
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*ID:*\n{}", notice.id) },
                { "type": "mrkdwn", "text": format!("*投稿時刻:*\n{submitted}") }
            ]
        }),
        json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*コメント:*\n{}", notice.comment) }
        }),
    ];

    if let Some(repo) = &notice.github_repository {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*GitHubリポジトリ:*\n{repo}") }
        }));
    }

    if let Some(issue_url) = &notice.github_issue_url {
        blocks.push(json!({
            "type": "section",
            "text": { "type": "mrkdwn", "text": format!("*GitHub Issue:*\n<{issue_url}|Issue を確認>") }
        }));
    }

    if let Some(url) = notice.screenshot_url.as_deref().filter(|u| is_http_url(u)) {
        blocks.push(json!({
            "type": "image",
            "title": { "type": "plain_text", "text": "スクリーンショット" },
            "image_url": url,
            "alt_text": "フィードバック時のスクリーンショット"
        }));
    }

    blocks.push(json!({
        "type": "context",
        "elements": [
            { "type": "mrkdwn", "text": format!("*ユーザーエージェント:* {}", notice.user_agent) }
        ]
    }));

    SlackMessage {
        channel: channel.to_string(),
        text: "フィードバックの詳細".to_string(),
        blocks,
        thread_ts: thread_ts.map(str::to_string),
    }
}

/// Alert posted when GitHub issue creation fails for a resolved project.
pub fn github_failure_message(
    channel: &str,
    feedback_id: i64,
    error: &str,
    project_name: Option<&str>,
    repo_url: Option<&str>,
    offset: FixedOffset,
) -> SlackMessage {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": { "type": "plain_text", "text": "⚠️ GitHub Issue作成エラー" }
        }),
        json!({
            "type": "section",
            "fields": [
                { "type": "mrkdwn", "text": format!("*フィードバックID:*\n{feedback_id}") },
                { "type": "mrkdwn", "text": format!("*エラー発生時刻:*\n{}", format_timestamp(Utc::now(), offset)) }
            ]
        }),
    ];

    let mut fields = Vec::new();
    if let Some(project) = project_name {
        fields.push(json!({ "type": "mrkdwn", "text": format!("*プロジェクト:*\n{project}") }));
    }
    if let Some(repo) = repo_url {
        fields.push(json!({ "type": "mrkdwn", "text": format!("*リポジトリ:*\n{repo}") }));
    }
    if !fields.is_empty() {
        blocks.push(json!({ "type": "section", "fields": fields }));
    }

    blocks.push(json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": format!("*エラー内容:*\n```{error}```") }
    }));
    blocks.push(json!({
        "type": "context",
        "elements": [{
            "type": "mrkdwn",
            "text": "💡 *考えられる原因:* リポジトリが存在しない、アクセス権限がない、GitHub Tokenが無効など"
        }]
    }));

    SlackMessage {
        channel: channel.to_string(),
        text: "GitHub Issue作成に失敗しました".to_string(),
        blocks,
        thread_ts: None,
    }
}

// ---------------------------------------------------------------------------
// SlackNotifier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Transport {
    Bot { token: String, api_url: String },
    Webhook { url: String },
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    ts: Option<String>,
    error: Option<String>,
}

pub struct SlackNotifier {
    client: reqwest::Client,
    transport: Option<Transport>,
    channel: String,
    offset: FixedOffset,
}

impl SlackNotifier {
    pub fn new(client: reqwest::Client, config: &SlackConfig, offset: FixedOffset) -> Self {
        let transport = match (&config.bot_token, &config.webhook_url) {
            (Some(token), webhook) => {
                if webhook.is_some() {
                    tracing::warn!("Both SLACK_BOT_TOKEN and SLACK_WEBHOOK_URL are set, using bot mode");
                }
                Some(Transport::Bot {
                    token: token.clone(),
                    api_url: trim_base(&config.api_url),
                })
            }
            (None, Some(url)) => Some(Transport::Webhook { url: url.clone() }),
            (None, None) => None,
        };
        Self {
            client,
            transport,
            channel: config.channel_id.clone(),
            offset,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.transport.is_some()
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Post one message through the configured transport.
    pub async fn send(&self, message: &SlackMessage) -> Result<MessageHandle, SlackError> {
        match self.transport.as_ref().ok_or(SlackError::NotConfigured)? {
            Transport::Bot { token, api_url } => {
                let response = self
                    .client
                    .post(format!("{api_url}/chat.postMessage"))
                    .bearer_auth(token)
                    .json(message)
                    .send()
                    .await?;
                if !response.status().is_success() {
                    return Err(SlackError::HttpStatus(response.status().as_u16()));
                }
                let body: PostMessageResponse = response.json().await?;
                if !body.ok {
                    return Err(SlackError::Api(
                        body.error.unwrap_or_else(|| "unknown_error".to_string()),
                    ));
                }
                body.ts
                    .filter(|ts| !ts.is_empty())
                    .map(MessageHandle::Thread)
                    .ok_or(SlackError::MissingHandle)
            }
            Transport::Webhook { url } => {
                let response = self.client.post(url).json(message).send().await?;
                if !response.status().is_success() {
                    return Err(SlackError::HttpStatus(response.status().as_u16()));
                }
                Ok(MessageHandle::Webhook)
            }
        }
    }

    /// Post the title message, then the detail message as its thread reply.
    ///
    /// Succeeds only when both posts succeed; a failed title short-circuits
    /// the detail post.
    pub async fn notify_feedback_received(&self, notice: &FeedbackNotice) -> Result<(), SlackError> {
        let handle = self.send(&title_message(&self.channel, notice)).await?;
        tracing::debug!(feedback_id = %notice.id, "Slack title message sent");

        let detail = detail_message(&self.channel, notice, handle.thread_ts(), self.offset);
        self.send(&detail).await?;
        tracing::debug!(feedback_id = %notice.id, "Slack detail message sent");
        Ok(())
    }

    /// Alert the channel that issue creation failed.
    pub async fn notify_github_issue_failed(
        &self,
        feedback_id: i64,
        error: &str,
        project_name: Option<&str>,
        repo_url: Option<&str>,
    ) -> Result<(), SlackError> {
        let message = github_failure_message(
            &self.channel,
            feedback_id,
            error,
            project_name,
            repo_url,
            self.offset,
        );
        self.send(&message).await.map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use feedback_core::timestamps::display_offset;
    use mockito::{Matcher, Server};

    use super::*;
    use crate::http_client;

    fn notice() -> FeedbackNotice {
        FeedbackNotice {
            id: "7".into(),
            comment: "ボタンが押せない".into(),
            tab_url: "https://app.example/settings".into(),
            tab_title: "Settings".into(),
            timestamp: TimestampInput::Number(1_734_944_285.0),
            user_agent: "Mozilla/5.0".into(),
            screenshot_url: Some("https://bucket.example/shot.png".into()),
            github_issue_url: None,
            github_repository: None,
            project_name: Some("Poly".into()),
            reporter_name: Some("kim".into()),
        }
    }

    fn bot_config(api_url: &str) -> SlackConfig {
        SlackConfig {
            bot_token: Some("xoxb-test".into()),
            webhook_url: None,
            channel_id: "C123".into(),
            api_url: api_url.into(),
        }
    }

    fn texts(message: &SlackMessage) -> String {
        serde_json::to_string(&message.blocks).unwrap()
    }

    #[test]
    fn title_uses_fallbacks() {
        let mut n = notice();
        assert_eq!(title_text(&n), "[FB]Poly (kim)");
        n.project_name = None;
        n.reporter_name = None;
        assert_eq!(title_text(&n), "[FB]プロジェクト (匿名)");
    }

    #[test]
    fn detail_time_is_identical_for_seconds_millis_and_strings() {
        let offset = display_offset(9);
        for ts in [
            TimestampInput::Number(1_734_944_285.0),
            TimestampInput::Number(1_734_944_285_000.0),
            TimestampInput::Text("1734944285".into()),
        ] {
            let mut n = notice();
            n.timestamp = ts;
            let message = detail_message("C", &n, Some("1.0"), offset);
            assert!(texts(&message).contains("2024/12/23 17:58:05"));
        }
    }

    #[test]
    fn detail_includes_optional_blocks_only_when_present() {
        let offset = display_offset(9);
        let mut n = notice();
        let bare = detail_message("C", &n, None, offset);
        assert!(!texts(&bare).contains("GitHub Issue"));
        assert!(texts(&bare).contains("\"image\""));

        n.github_issue_url = Some("https://github.com/o/r/issues/1".into());
        n.github_repository = Some("https://github.com/o/r".into());
        n.screenshot_url = Some("/uploads/local.png".into());
        let full = detail_message("C", &n, None, offset);
        assert!(texts(&full).contains("Issue を確認"));
        assert!(texts(&full).contains("GitHubリポジトリ"));
        assert!(!texts(&full).contains("\"image\""));
    }

    #[test]
    fn failure_alert_lists_project_and_repo() {
        let message = github_failure_message("C", 9, "Not Found", Some("Poly"), None, display_offset(9));
        let body = texts(&message);
        assert!(body.contains("*フィードバックID:*\\n9"));
        assert!(body.contains("*プロジェクト:*\\nPoly"));
        assert!(!body.contains("リポジトリ:*"));
        assert!(body.contains("Not Found"));
    }

    #[tokio::test]
    async fn bot_mode_threads_detail_under_title() {
        let mut server = Server::new_async().await;
        let title = server
            .mock("POST", "/chat.postMessage")
            .match_header("authorization", "Bearer xoxb-test")
            .match_body(Matcher::PartialJson(json!({ "text": "[FB]Poly (kim)" })))
            .with_status(200)
            .with_body(r#"{"ok":true,"ts":"1700000000.000100"}"#)
            .create_async()
            .await;
        let detail = server
            .mock("POST", "/chat.postMessage")
            .match_body(Matcher::PartialJson(json!({ "thread_ts": "1700000000.000100" })))
            .with_status(200)
            .with_body(r#"{"ok":true,"ts":"1700000000.000200"}"#)
            .create_async()
            .await;

        let notifier = SlackNotifier::new(http_client(), &bot_config(&server.url()), display_offset(9));
        notifier.notify_feedback_received(&notice()).await.unwrap();

        title.assert_async().await;
        detail.assert_async().await;
    }

    #[tokio::test]
    async fn failed_title_skips_detail() {
        let mut server = Server::new_async().await;
        let title = server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_body(r#"{"ok":false,"error":"channel_not_found"}"#)
            .expect(1)
            .create_async()
            .await;

        let notifier = SlackNotifier::new(http_client(), &bot_config(&server.url()), display_offset(9));
        let err = notifier.notify_feedback_received(&notice()).await.unwrap_err();
        assert_matches!(err, SlackError::Api(ref e) if e == "channel_not_found");
        title.assert_async().await;
    }

    #[tokio::test]
    async fn missing_ts_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let notifier = SlackNotifier::new(http_client(), &bot_config(&server.url()), display_offset(9));
        assert_matches!(
            notifier.notify_feedback_received(&notice()).await,
            Err(SlackError::MissingHandle)
        );
    }

    #[tokio::test]
    async fn webhook_mode_posts_twice_without_thread() {
        let mut server = Server::new_async().await;
        let hook = server
            .mock("POST", "/hook")
            .with_status(200)
            .with_body("ok")
            .expect(2)
            .create_async()
            .await;

        let config = SlackConfig {
            bot_token: None,
            webhook_url: Some(format!("{}/hook", server.url())),
            channel_id: "C".into(),
            api_url: "unused".into(),
        };
        let notifier = SlackNotifier::new(http_client(), &config, display_offset(9));
        notifier.notify_feedback_received(&notice()).await.unwrap();
        hook.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat.postMessage")
            .with_status(500)
            .create_async()
            .await;

        let notifier = SlackNotifier::new(http_client(), &bot_config(&server.url()), display_offset(9));
        assert_matches!(
            notifier.notify_github_issue_failed(1, "boom", None, None).await,
            Err(SlackError::HttpStatus(500))
        );
    }

    #[tokio::test]
    async fn unconfigured_notifier_refuses() {
        let config = SlackConfig {
            bot_token: None,
            webhook_url: None,
            channel_id: "C".into(),
            api_url: "unused".into(),
        };
        let notifier = SlackNotifier::new(http_client(), &config, display_offset(9));
        assert!(!notifier.is_enabled());
        assert_matches!(
            notifier.notify_feedback_received(&notice()).await,
            Err(SlackError::NotConfigured)
        );
    }
}
