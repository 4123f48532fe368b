//! Short task titles from feedback comments.
//!
//! The LLM call is optional: when it is unconfigured or fails,
//! [`Summarizer::title_for`] falls back to a truncated comment and never
//! returns an error.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::SummarizerConfig;

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 30;

/// Title used for an empty comment.
pub const EMPTY_COMMENT_TITLE: &str = "フィードバック";

const SYSTEM_PROMPT: &str = "ユーザーからのフィードバックを、タスクのタイトルとして30文字以内で簡潔に要約してください。タイトルのみを出力してください。";

#[derive(Debug, thiserror::Error)]
pub enum SummarizeError {
    #[error("LLM API key is not configured")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API returned HTTP {0}")]
    HttpStatus(u16),

    #[error("LLM response contained no usable text")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// First [`MAX_TITLE_CHARS`] characters of the trimmed comment, with `...`
/// appended when truncated.
pub fn fallback_title(comment: &str) -> String {
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return EMPTY_COMMENT_TITLE.to_string();
    }
    if trimmed.chars().count() <= MAX_TITLE_CHARS {
        return trimmed.to_string();
    }
    let head: String = trimmed.chars().take(MAX_TITLE_CHARS).collect();
    format!("{head}...")
}

/// Clean up a model reply: first line, quotes stripped, length capped.
fn clamp_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let line = line.trim_matches(|c: char| matches!(c, '"' | '「' | '」' | '\''));
    if line.is_empty() {
        return None;
    }
    Some(line.chars().take(MAX_TITLE_CHARS).collect())
}

pub struct Summarizer {
    client: reqwest::Client,
    api_key: Option<String>,
    api_url: String,
    model: String,
}

impl Summarizer {
    pub fn new(client: reqwest::Client, config: &SummarizerConfig) -> Self {
        Self {
            client,
            api_key: config.api_key.clone(),
            api_url: config.api_url.clone(),
            model: config.model.clone(),
        }
    }

    /// Ask the model for a title.
    pub async fn summarize(&self, comment: &str) -> Result<String, SummarizeError> {
        let api_key = self.api_key.as_deref().ok_or(SummarizeError::NotConfigured)?;

        let messages = [
            ChatMessage {
                role: "system",
                content: SYSTEM_PROMPT,
            },
            ChatMessage {
                role: "user",
                content: comment,
            },
        ];
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "max_tokens": 60,
                "temperature": 0.3,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummarizeError::HttpStatus(status.as_u16()));
        }

        let body: ChatResponse = response.json().await?;
        body.choices
            .into_iter()
            .find_map(|c| c.message.content)
            .and_then(|text| clamp_title(&text))
            .ok_or(SummarizeError::EmptyResponse)
    }

    /// Title for `comment`; uses [`fallback_title`] when the model is
    /// unavailable.
    pub async fn title_for(&self, comment: &str) -> String {
        if comment.trim().is_empty() {
            return EMPTY_COMMENT_TITLE.to_string();
        }
        match self.summarize(comment).await {
            Ok(title) => title,
            Err(SummarizeError::NotConfigured) => fallback_title(comment),
            Err(e) => {
                tracing::warn!(error = %e, "Title summarisation failed, using truncated comment");
                fallback_title(comment)
            }
        }
    }
}
