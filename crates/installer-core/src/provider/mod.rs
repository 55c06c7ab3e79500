//! Release API adapters for code hosting platforms (GitHub, GitLab, etc.).

/// GitHub-style REST adapter (GitHub, Codeberg, Forgejo, Gitea).
pub mod github;
/// GitLab REST adapter.
pub mod gitlab;

use std::str::FromStr;

use async_trait::async_trait;
use installer_schema::{ReleaseAsset, RepoInfo};
use reqwest::{Client, StatusCode, header::ACCEPT};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Error, Result};

pub use github::GitHub;
pub use gitlab::GitLab;

/// GitHub's public API host.
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";
/// Codeberg's public API host.
pub const DEFAULT_CODEBERG_API: &str = "https://codeberg.org/api/v1";
/// GitLab's public API host.
pub const DEFAULT_GITLAB_API: &str = "https://gitlab.com/api/v4";

/// The assets of one release, with the tag the provider resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Tag actually served (differs from the request when it asked for `latest`).
    pub version: String,
    /// Attached files, in provider order.
    pub assets: Vec<ReleaseAsset>,
}

/// A hosted release API.
///
/// `token` is forwarded as a bearer token; pass an empty string for
/// anonymous access.
#[async_trait]
pub trait ReleaseProvider: Send + Sync {
    /// Fetch repository visibility.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] for a missing repository, or any transport error.
    async fn get_repo(&self, user: &str, repo: &str, token: &str) -> Result<RepoInfo>;

    /// Fetch the assets of `release` (`latest` or a tag name).
    ///
    /// # Errors
    ///
    /// [`Error::ReleaseNotFound`] for an unknown tag, [`Error::NoReleases`]
    /// when nothing is published, or any transport error.
    async fn get_release_assets(
        &self,
        user: &str,
        repo: &str,
        release: &str,
        token: &str,
    ) -> Result<Release>;
}

/// Provider names accepted in request paths and configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    /// github.com
    GitHub,
    /// codeberg.org
    Codeberg,
    /// A self-hosted Forgejo or Gitea instance.
    Forgejo,
}

impl ProviderKind {
    /// Lowercase name as it appears in paths.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Codeberg => "codeberg",
            Self::Forgejo => "forgejo",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "github" | "" => Ok(Self::GitHub),
            "codeberg" => Ok(Self::Codeberg),
            "forgejo" => Ok(Self::Forgejo),
            other => Err(Error::UnknownProvider(other.to_string())),
        }
    }
}

/// API base URLs for every provider kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderEndpoints {
    /// GitHub API base.
    pub github: String,
    /// Codeberg API base.
    pub codeberg: String,
    /// Forgejo instance URL (without `/api/v1`), operator supplied.
    pub forgejo: Option<String>,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            github: DEFAULT_GITHUB_API.to_string(),
            codeberg: DEFAULT_CODEBERG_API.to_string(),
            forgejo: None,
        }
    }
}

impl ProviderEndpoints {
    /// API base URL for `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingProviderUrl`] for Forgejo without a configured instance.
    pub fn api_base(&self, kind: ProviderKind) -> Result<String> {
        match kind {
            ProviderKind::GitHub => Ok(self.github.trim_end_matches('/').to_string()),
            ProviderKind::Codeberg => Ok(self.codeberg.trim_end_matches('/').to_string()),
            ProviderKind::Forgejo => match self.forgejo.as_deref() {
                Some(url) if !url.trim().is_empty() => {
                    Ok(format!("{}/api/v1", url.trim().trim_end_matches('/')))
                }
                _ => Err(Error::MissingProviderUrl),
            },
        }
    }
}

/// Build the client for `kind`. Every named kind speaks the GitHub-style API.
///
/// # Errors
///
/// Returns [`Error::MissingProviderUrl`] for Forgejo without a configured instance.
pub fn connect(
    kind: ProviderKind,
    endpoints: &ProviderEndpoints,
    client: Client,
) -> Result<Box<dyn ReleaseProvider>> {
    let base_url = endpoints.api_base(kind)?;
    Ok(Box::new(GitHub::new(base_url, client)))
}

/// Shared HTTP plumbing for the adapters.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    /// Wrap a configured `reqwest` client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// GET `url` and decode the JSON body into `T`.
    ///
    /// Use `serde::de::IgnoredAny` as `T` for a plain existence check.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] on 404, [`Error::UnexpectedStatus`] on any other
    /// non-200, [`Error::Transport`] / [`Error::Decode`] otherwise.
    pub async fn get<T: DeserializeOwned>(&self, url: &str, token: &str) -> Result<T> {
        debug!(%url, "Fetching from provider");

        let mut request = self.client.get(url).header(ACCEPT, "application/json");
        if !token.is_empty() {
            request = request.bearer_auth(token);
        }

        let transport = |source| Error::Transport {
            url: url.to_string(),
            source,
        };
        let response = request.send().await.map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound {
                url: url.to_string(),
            });
        }
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&bytes).map_err(|source| Error::Decode {
            url: url.to_string(),
            source,
        })
    }
}
