//! GitHub repository URL parsing.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// `git@github.com:owner/repo(.git)?`
static SSH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^git@github\.com:([^/]+)/([^./]+)(?:\.git)?$").expect("valid regex"));

/// `https://github.com/owner/repo(.git)?`
static HTTPS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https://github\.com/([^/]+)/([^/]+?)(?:\.git)?$").expect("valid regex"));

/// Owner/name pair identifying a GitHub repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitHubRepository {
    pub owner: String,
    pub repo: String,
}

impl GitHubRepository {
    /// GitHub treats owner and repository names case-insensitively.
    pub fn same_repository(&self, other: &Self) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner) && self.repo.eq_ignore_ascii_case(&other.repo)
    }

    /// `owner/repo` slug.
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// Parse an SSH or HTTPS GitHub URL into owner and repository.
///
/// Returns `None` for any other shape, including non-GitHub hosts.
pub fn parse_github_repository(url: &str) -> Option<GitHubRepository> {
    let url = url.trim();
    let captures = SSH_PATTERN
        .captures(url)
        .or_else(|| HTTPS_PATTERN.captures(url))?;

    let owner = captures.get(1)?.as_str();
    let repo = captures.get(2)?.as_str();
    if owner.is_empty() || repo.is_empty() {
        return None;
    }

    Some(GitHubRepository {
        owner: owner.to_string(),
        repo: repo.to_string(),
    })
}
