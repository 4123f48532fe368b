//! Outbound notification adapters.
//!
//! Each adapter wraps one external HTTP service and reports failures as a
//! typed error; none of them decides whether a failure matters. That policy
//! lives in the notification pipeline.
//!
//! - [`slack::SlackNotifier`]: threaded feedback messages and failure alerts.
//! - [`github::GitHubClient`]: issue creation.
//! - [`task_server::TaskServerClient`]: task creation on the task tracker.
//! - [`summarizer::Summarizer`]: short task titles via an LLM.
//! - [`projects::ProjectCatalog`]: registered projects from the auth server.

use std::time::Duration;

pub mod config;
pub mod github;
pub mod projects;
pub mod slack;
pub mod summarizer;
pub mod task_server;

pub use config::NotifyConfig;
pub use github::{GitHubClient, GitHubError};
pub use projects::{CatalogError, ProjectCatalog};
pub use slack::{SlackError, SlackNotifier};
pub use summarizer::{SummarizeError, Summarizer};
pub use task_server::{TaskServerClient, TaskServerError};

/// HTTP request timeout for a single outbound call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// `User-Agent` sent on every outbound request.
pub const USER_AGENT: &str = "feedback-suite";

/// Build the shared HTTP client used by every adapter.
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .expect("Failed to build reqwest HTTP client")
}

/// Strip trailing slashes so paths can be appended with `format!`.
pub(crate) fn trim_base(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
