use async_trait::async_trait;
use installer_schema::{ReleaseAsset, RepoInfo};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{ApiClient, DEFAULT_GITLAB_API, Release, ReleaseProvider};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct GlLink {
    name: String,
    url: String,
    #[serde(default)]
    size: u64,
}

#[derive(Debug, Default, Deserialize)]
struct GlAssets {
    #[serde(default)]
    links: Vec<GlLink>,
}

#[derive(Debug, Deserialize)]
struct GlRelease {
    tag_name: String,
    #[serde(default)]
    assets: GlAssets,
}

#[derive(Debug, Deserialize)]
struct GlProject {
    #[serde(default)]
    visibility: String,
}

impl From<GlLink> for ReleaseAsset {
    fn from(link: GlLink) -> Self {
        Self {
            name: link.name,
            size: link.size,
            download_url: link.url.clone(),
            api_url: link.url,
        }
    }
}

impl From<GlRelease> for Release {
    fn from(r: GlRelease) -> Self {
        Self {
            version: r.tag_name,
            assets: r.assets.links.into_iter().map(ReleaseAsset::from).collect(),
        }
    }
}

/// Client for GitLab's v4 REST API.
#[derive(Debug, Clone)]
pub struct GitLab {
    api: ApiClient,
    base_url: String,
}

impl GitLab {
    /// Client against `base_url`, e.g. `https://gitlab.com/api/v4`.
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            api: ApiClient::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Client against gitlab.com.
    pub fn public(client: Client) -> Self {
        Self::new(DEFAULT_GITLAB_API, client)
    }

    fn project_url(&self, user: &str, repo: &str) -> String {
        format!("{}/projects/{user}%2F{repo}", self.base_url)
    }
}

#[async_trait]
impl ReleaseProvider for GitLab {
    async fn get_repo(&self, user: &str, repo: &str, token: &str) -> Result<RepoInfo> {
        if user.is_empty() || repo.is_empty() {
            return Err(Error::InvalidPath);
        }
        let project: GlProject = self.api.get(&self.project_url(user, repo), token).await?;
        Ok(RepoInfo {
            private: project.visibility == "private",
        })
    }

    async fn get_release_assets(
        &self,
        user: &str,
        repo: &str,
        release: &str,
        token: &str,
    ) -> Result<Release> {
        info!("fetching asset info for {user}/{repo}@{release}");

        let releases_url = format!("{}/releases", self.project_url(user, repo));

        if release.is_empty() || release == "latest" {
            // GitLab lists releases newest first.
            let releases: Vec<GlRelease> = self.api.get(&releases_url, token).await?;
            let newest = releases.into_iter().next().ok_or(Error::NoReleases)?;
            return Ok(newest.into());
        }

        match self.api.get::<GlRelease>(&format!("{releases_url}/{release}"), token).await {
            Ok(found) => Ok(found.into()),
            Err(Error::NotFound { .. }) => Err(Error::ReleaseNotFound(release.to_string())),
            Err(e) => Err(e),
        }
    }
}
