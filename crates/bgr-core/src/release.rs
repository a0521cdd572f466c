//! Release index lookups.
//!
//! [`ReleaseSource`] is the seam the installer depends on; [`GitHubReleases`]
//! implements it against the GitHub REST API (or anything serving the same
//! JSON shape, which is how the tests point it at a mock server).

use async_trait::async_trait;
use bgr_schema::GitHubRepo;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

/// A tagged release and its downloadable assets.
///
/// Untrusted input until the binary asset has been checksum-verified.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseDescriptor {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<AssetDescriptor>,
}

/// An asset attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetDescriptor {
    pub name: String,
    pub browser_download_url: String,
}

impl ReleaseDescriptor {
    /// First asset whose name equals `name` exactly.
    pub fn asset(&self, name: &str) -> Option<&AssetDescriptor> {
        self.assets.iter().find(|a| a.name == name)
    }
}

#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("malformed release response from {url}: {source}")]
    Malformed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A remote index that can describe a release by version.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Unique identifier for this source instance (e.g. "github:api.github.com")
    fn key(&self) -> String;

    /// Fetch one release. `version == "latest"` selects the most recent
    /// published release; anything else is an exact tag.
    async fn get_release(
        &self,
        repo: &GitHubRepo,
        version: &str,
    ) -> Result<ReleaseDescriptor, ReleaseError>;
}

/// GitHub REST release lookups.
#[derive(Debug, Clone)]
pub struct GitHubReleases {
    client: Client,
    api_url: String,
    token: Option<String>,
}

impl GitHubReleases {
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: None,
        }
    }

    /// Authenticate requests (raises the anonymous rate limit).
    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Endpoint for `repo` at `version`.
    pub fn endpoint(&self, repo: &GitHubRepo, version: &str) -> String {
        if version == "latest" {
            format!("{}/repos/{repo}/releases/latest", self.api_url)
        } else {
            format!("{}/repos/{repo}/releases/tags/{version}", self.api_url)
        }
    }
}

#[async_trait]
impl ReleaseSource for GitHubReleases {
    fn key(&self) -> String {
        format!("github:{}", self.api_url)
    }

    async fn get_release(
        &self,
        repo: &GitHubRepo,
        version: &str,
    ) -> Result<ReleaseDescriptor, ReleaseError> {
        let url = self.endpoint(repo, version);
        tracing::debug!(%url, "fetching release");

        let mut request = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, crate::USER_AGENT)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|source| ReleaseError::Http {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReleaseError::Status { url, status });
        }

        let body = response.text().await.map_err(|source| ReleaseError::Http {
            url: url.clone(),
            source,
        })?;

        serde_json::from_str(&body).map_err(|source| ReleaseError::Malformed { url, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn repo() -> GitHubRepo {
        GitHubRepo::new("org/tool").unwrap()
    }

    #[test]
    fn endpoint_selects_latest_or_tag() {
        let gh = GitHubReleases::new(Client::new(), "https://api.example.com/");
        assert_eq!(
            gh.endpoint(&repo(), "latest"),
            "https://api.example.com/repos/org/tool/releases/latest"
        );
        assert_eq!(
            gh.endpoint(&repo(), "v1.2.0"),
            "https://api.example.com/repos/org/tool/releases/tags/v1.2.0"
        );
    }

    #[tokio::test]
    async fn fetches_latest_release() {
        let mut server = Server::new_async().await;
        let body = r#"{
            "tag_name": "v1.0.0",
            "draft": false,
            "assets": [
                {"name": "bg-remover-ubuntu-x86_64", "browser_download_url": "https://dl/1", "size": 1},
                {"name": "checksums.txt", "browser_download_url": "https://dl/2", "size": 2}
            ]
        }"#;
        let _m = server
            .mock("GET", "/repos/org/tool/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let gh = GitHubReleases::new(Client::new(), server.url());
        let release = gh.get_release(&repo(), "latest").await.unwrap();

        assert_eq!(release.tag_name, "v1.0.0");
        assert_eq!(release.assets.len(), 2);
        assert_eq!(
            release.asset("checksums.txt").unwrap().browser_download_url,
            "https://dl/2"
        );
        assert!(release.asset("bg-remover").is_none());
    }

    #[tokio::test]
    async fn sends_token_when_configured() {
        let mut server = Server::new_async().await;
        let m = server
            .mock("GET", "/repos/org/tool/releases/tags/v2")
            .match_header("authorization", "Bearer secret")
            .with_status(200)
            .with_body(r#"{"tag_name": "v2", "assets": []}"#)
            .create_async()
            .await;

        let gh = GitHubReleases::new(Client::new(), server.url()).with_token(Some("secret".into()));
        gh.get_release(&repo(), "v2").await.unwrap();
        m.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/org/tool/releases/tags/v9")
            .with_status(404)
            .with_body(r#"{"message": "Not Found"}"#)
            .create_async()
            .await;

        let gh = GitHubReleases::new(Client::new(), server.url());
        let err = gh.get_release(&repo(), "v9").await.unwrap_err();
        assert!(matches!(err, ReleaseError::Status { status, .. } if status.as_u16() == 404));
    }

    #[tokio::test]
    async fn malformed_body_is_an_error() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("GET", "/repos/org/tool/releases/latest")
            .with_status(200)
            .with_body(r#"{"assets": "nope"}"#)
            .create_async()
            .await;

        let gh = GitHubReleases::new(Client::new(), server.url());
        let err = gh.get_release(&repo(), "latest").await.unwrap_err();
        assert!(matches!(err, ReleaseError::Malformed { .. }));
    }
}
