//! Mapping page URLs onto registered projects.
//!
//! Projects are owned by the external catalog service; this module only
//! decides which catalog entry a captured page belongs to.

use serde::{Deserialize, Serialize};

use crate::github_repo::parse_github_repository;

/// A project entry as returned by the catalog service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    pub id: Option<i64>,
    pub name: String,
    pub display_name: Option<String>,
    pub github_repository: Option<String>,
    pub domain_local: Option<String>,
    pub domain_development: Option<String>,
    pub domain_staging: Option<String>,
    pub domain_production: Option<String>,
}

impl Project {
    /// The four environment domains, skipping unset or empty ones.
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        [
            &self.domain_local,
            &self.domain_development,
            &self.domain_staging,
            &self.domain_production,
        ]
        .into_iter()
        .filter_map(|d| d.as_deref())
        .map(str::trim)
        .filter(|d| !d.is_empty())
    }

    /// Name shown to humans: display name when present, else the slug.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(&self.name)
    }
}

/// How strongly a URL domain matched a project domain.
///
/// Ordered from weakest to strongest so `max()` picks the best match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    /// One domain is a dot-suffix of the other.
    Subdomain,
    /// Two `*.localhost:PORT` hosts sharing the same port.
    LocalhostPort,
    /// Byte-for-byte equal.
    Exact,
}

/// Extract `host[:port]` from a URL, or an empty string if it does not parse.
///
/// Default ports are omitted, matching browser `URL.host` semantics.
pub fn extract_domain_from_url(url: &str) -> String {
    let Ok(parsed) = url::Url::parse(url.trim()) else {
        return String::new();
    };
    match (parsed.host_str(), parsed.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}

/// Classify the relationship between a URL domain and a project domain.
///
/// Rules, in priority order:
/// 1. exact equality;
/// 2. when both mention `localhost` and both are subdomain-qualified, equal
///    trailing `localhost:PORT` tokens match regardless of the label; any
///    other localhost pairing only matches exactly;
/// 3. either side is a dot-suffix of the other.
pub fn match_kind(url_domain: &str, project_domain: &str) -> Option<MatchKind> {
    if url_domain.is_empty() || project_domain.is_empty() {
        return None;
    }
    if url_domain == project_domain {
        return Some(MatchKind::Exact);
    }

    if url_domain.contains("localhost") && project_domain.contains("localhost") {
        let url_parts: Vec<&str> = url_domain.split('.').collect();
        let project_parts: Vec<&str> = project_domain.split('.').collect();
        if url_parts.len() >= 2
            && project_parts.len() >= 2
            && url_parts.last() == project_parts.last()
        {
            return Some(MatchKind::LocalhostPort);
        }
        return None;
    }

    if url_domain.ends_with(&format!(".{project_domain}"))
        || project_domain.ends_with(&format!(".{url_domain}"))
    {
        return Some(MatchKind::Subdomain);
    }

    None
}

/// Boolean form of [`match_kind`]. Symmetric in its arguments.
pub fn is_domain_match(url_domain: &str, project_domain: &str) -> bool {
    match_kind(url_domain, project_domain).is_some()
}

/// Pick the project owning `url_domain`.
///
/// Each project is scored by its strongest [`MatchKind`] across its four
/// domains; the highest score wins and ties go to the earlier catalog entry.
pub fn find_best_project<'a>(projects: &'a [Project], url_domain: &str) -> Option<&'a Project> {
    if url_domain.is_empty() {
        return None;
    }

    let mut best: Option<(MatchKind, &Project)> = None;
    for project in projects {
        let Some(kind) = project
            .domains()
            .filter_map(|d| match_kind(url_domain, d))
            .max()
        else {
            continue;
        };
        match best {
            Some((current, _)) if kind <= current => {}
            _ => best = Some((kind, project)),
        }
    }
    best.map(|(_, project)| project)
}

/// Find the project whose repository field refers to the same GitHub
/// repository as `hint`.
///
/// Both sides are compared as parsed `owner/repo` pairs (case-insensitive);
/// unparsable values fall back to trimmed string equality.
pub fn find_project_by_repository<'a>(projects: &'a [Project], hint: &str) -> Option<&'a Project> {
    let hint = hint.trim();
    if hint.is_empty() {
        return None;
    }
    let hint_repo = parse_github_repository(hint);

    projects.iter().find(|project| {
        let Some(candidate) = project.github_repository.as_deref().map(str::trim) else {
            return false;
        };
        match (&hint_repo, parse_github_repository(candidate)) {
            (Some(a), Some(b)) => a.same_repository(&b),
            _ => candidate == hint,
        }
    })
}
