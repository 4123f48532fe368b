//! Project catalog client.
//!
//! Projects are served by the auth server at `GET {base}/api/projects`.

use feedback_core::domain_match::{extract_domain_from_url, find_best_project, find_project_by_repository, Project};
use serde::Deserialize;

use crate::config::CatalogConfig;
use crate::trim_base;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// `AUTH_SERVER_URL` or `AUTH_SERVER_TOKEN` is missing.
    #[error("AUTH_SERVER_URL and AUTH_SERVER_TOKEN are required")]
    NotConfigured,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Project catalog returned HTTP {0}")]
    HttpStatus(u16),
}

#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    #[serde(default)]
    data: Vec<Project>,
}

pub struct ProjectCatalog {
    client: reqwest::Client,
    base_url: Option<String>,
    token: Option<String>,
}

impl ProjectCatalog {
    pub fn new(client: reqwest::Client, config: &CatalogConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.as_deref().map(trim_base),
            token: config.token.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.base_url.is_some() && self.token.is_some()
    }

    /// Fetch the full catalog, in server order.
    pub async fn fetch_projects(&self) -> Result<Vec<Project>, CatalogError> {
        let (Some(base), Some(token)) = (self.base_url.as_deref(), self.token.as_deref()) else {
            return Err(CatalogError::NotConfigured);
        };

        let response = self
            .client
            .get(format!("{base}/api/projects"))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::HttpStatus(status.as_u16()));
        }

        let body: ProjectsResponse = response.json().await?;
        tracing::debug!(count = body.data.len(), "Fetched project catalog");
        Ok(body.data)
    }

    /// Project owning `url`, or `None` when the URL has no host or nothing
    /// matches.
    pub async fn find_project_by_url(&self, url: &str) -> Result<Option<Project>, CatalogError> {
        let domain = extract_domain_from_url(url);
        if domain.is_empty() {
            return Ok(None);
        }
        let projects = self.fetch_projects().await?;
        Ok(find_best_project(&projects, &domain).cloned())
    }

    /// Project whose repository field refers to `hint`.
    pub async fn find_project_by_repository(&self, hint: &str) -> Result<Option<Project>, CatalogError> {
        let projects = self.fetch_projects().await?;
        Ok(find_project_by_repository(&projects, hint).cloned())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use mockito::Server;

    use super::*;
    use crate::http_client;

    const CATALOG: &str = r#"{
        "data": [
            {"id": 1, "name": "parent", "domainProduction": "example.com", "githubRepository": "https://github.com/org/parent"},
            {"id": 2, "name": "child", "domainDevelopment": "dev.example.com", "githubRepository": null}
        ],
        "meta": {"total": 2}
    }"#;

    fn catalog(base: Option<&str>, token: Option<&str>) -> ProjectCatalog {
        ProjectCatalog::new(
            http_client(),
            &CatalogConfig {
                base_url: base.map(str::to_string),
                token: token.map(str::to_string),
            },
        )
    }

    #[tokio::test]
    async fn resolves_best_match_by_url() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/projects")
            .match_header("authorization", "Bearer cat-token")
            .with_status(200)
            .with_body(CATALOG)
            .create_async()
            .await;

        let c = catalog(Some(&server.url()), Some("cat-token"));
        let project = c
            .find_project_by_url("https://dev.example.com/page")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(project.name, "child");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn resolves_by_repository_hint() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/projects")
            .with_status(200)
            .with_body(CATALOG)
            .create_async()
            .await;

        let c = catalog(Some(&server.url()), Some("t"));
        let project = c
            .find_project_by_repository("git@github.com:Org/Parent.git")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(project.name, "parent");
    }

    #[tokio::test]
    async fn unparsable_url_skips_fetch() {
        let mut server = Server::new_async().await;
        let mock = server.mock("GET", "/api/projects").expect(0).create_async().await;

        let c = catalog(Some(&server.url()), Some("t"));
        assert!(c.find_project_by_url("not a url").await.unwrap().is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/projects")
            .with_status(401)
            .create_async()
            .await;

        let c = catalog(Some(&server.url()), Some("t"));
        assert_matches!(c.fetch_projects().await, Err(CatalogError::HttpStatus(401)));
    }

    #[tokio::test]
    async fn missing_configuration() {
        let c = catalog(None, Some("t"));
        assert!(!c.is_configured());
        assert_matches!(c.fetch_projects().await, Err(CatalogError::NotConfigured));
    }
}
