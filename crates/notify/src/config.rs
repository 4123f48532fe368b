//! Adapter configuration loaded from the environment.

use chrono::FixedOffset;
use feedback_core::settings::{credential_from_env, parsed_from_env, string_from_env};
use feedback_core::timestamps::display_offset;

/// Default Slack channel when `SLACK_CHANNEL_ID` is unset.
pub const DEFAULT_SLACK_CHANNEL: &str = "#general";
pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TASK_SERVER_URL: &str = "https://tasks.polyrhythm.tokyo";
pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
/// Hours east of UTC used when rendering times for humans.
pub const DEFAULT_DISPLAY_UTC_OFFSET_HOURS: i32 = 9;

#[derive(Debug, Clone)]
pub struct SlackConfig {
    pub bot_token: Option<String>,
    pub webhook_url: Option<String>,
    pub channel_id: String,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct TaskServerConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub base_url: Option<String>,
    pub token: Option<String>,
}

/// Configuration for every outbound adapter.
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub slack: SlackConfig,
    pub github: GitHubConfig,
    pub task_server: TaskServerConfig,
    pub summarizer: SummarizerConfig,
    pub catalog: CatalogConfig,
    pub display_offset: FixedOffset,
}

impl NotifyConfig {
    /// Load configuration from environment variables.
    ///
    /// Every credential is optional; a missing one disables the matching
    /// adapter instead of failing startup.
    ///
    /// | Variable                   | Default                                      |
    /// |----------------------------|----------------------------------------------|
    /// | `SLACK_BOT_TOKEN`          | none                                         |
    /// | `SLACK_WEBHOOK_URL`        | none                                         |
    /// | `SLACK_CHANNEL_ID`         | `#general`                                   |
    /// | `SLACK_API_URL`            | `https://slack.com/api`                      |
    /// | `GITHUB_TOKEN`             | none                                         |
    /// | `GITHUB_API_URL`           | `https://api.github.com`                     |
    /// | `TASK_SERVER_API_KEY`      | none                                         |
    /// | `TASK_SERVER_URL`          | `https://tasks.polyrhythm.tokyo`             |
    /// | `LLM_API_KEY`              | none                                         |
    /// | `LLM_API_URL`              | `https://api.openai.com/v1/chat/completions` |
    /// | `LLM_MODEL`                | `gpt-4o-mini`                                |
    /// | `AUTH_SERVER_URL`          | none                                         |
    /// | `AUTH_SERVER_TOKEN`        | none                                         |
    /// | `DISPLAY_UTC_OFFSET_HOURS` | `9`                                          |
    pub fn from_env() -> Self {
        Self {
            slack: SlackConfig {
                bot_token: credential_from_env("SLACK_BOT_TOKEN"),
                webhook_url: credential_from_env("SLACK_WEBHOOK_URL"),
                channel_id: string_from_env("SLACK_CHANNEL_ID", DEFAULT_SLACK_CHANNEL),
                api_url: string_from_env("SLACK_API_URL", DEFAULT_SLACK_API_URL),
            },
            github: GitHubConfig {
                token: credential_from_env("GITHUB_TOKEN"),
                api_url: string_from_env("GITHUB_API_URL", DEFAULT_GITHUB_API_URL),
            },
            task_server: TaskServerConfig {
                api_key: credential_from_env("TASK_SERVER_API_KEY"),
                base_url: string_from_env("TASK_SERVER_URL", DEFAULT_TASK_SERVER_URL),
            },
            summarizer: SummarizerConfig {
                api_key: credential_from_env("LLM_API_KEY"),
                api_url: string_from_env("LLM_API_URL", DEFAULT_LLM_API_URL),
                model: string_from_env("LLM_MODEL", DEFAULT_LLM_MODEL),
            },
            catalog: CatalogConfig {
                base_url: credential_from_env("AUTH_SERVER_URL"),
                token: credential_from_env("AUTH_SERVER_TOKEN"),
            },
            display_offset: display_offset(parsed_from_env(
                "DISPLAY_UTC_OFFSET_HOURS",
                DEFAULT_DISPLAY_UTC_OFFSET_HOURS,
            )),
        }
    }

    /// Everything disabled; used by tests that exercise ingestion without
    /// any outbound services.
    pub fn disabled() -> Self {
        Self {
            slack: SlackConfig {
                bot_token: None,
                webhook_url: None,
                channel_id: DEFAULT_SLACK_CHANNEL.to_string(),
                api_url: DEFAULT_SLACK_API_URL.to_string(),
            },
            github: GitHubConfig {
                token: None,
                api_url: DEFAULT_GITHUB_API_URL.to_string(),
            },
            task_server: TaskServerConfig {
                api_key: None,
                base_url: DEFAULT_TASK_SERVER_URL.to_string(),
            },
            summarizer: SummarizerConfig {
                api_key: None,
                api_url: DEFAULT_LLM_API_URL.to_string(),
                model: DEFAULT_LLM_MODEL.to_string(),
            },
            catalog: CatalogConfig {
                base_url: None,
                token: None,
            },
            display_offset: display_offset(DEFAULT_DISPLAY_UTC_OFFSET_HOURS),
        }
    }
}
