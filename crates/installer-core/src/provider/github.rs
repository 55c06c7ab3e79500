use async_trait::async_trait;
use installer_schema::{ReleaseAsset, RepoInfo};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use super::{ApiClient, Release, ReleaseProvider};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct GhAsset {
    name: String,
    #[serde(default)]
    size: u64,
    browser_download_url: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct GhRelease {
    tag_name: String,
    #[serde(default)]
    assets: Vec<GhAsset>,
}

#[derive(Debug, Deserialize)]
struct GhRepo {
    #[serde(default)]
    private: bool,
}

impl From<GhAsset> for ReleaseAsset {
    fn from(a: GhAsset) -> Self {
        Self {
            name: a.name,
            size: a.size,
            download_url: a.browser_download_url,
            api_url: a.url,
        }
    }
}

/// Client for GitHub's REST API and the compatible Gitea/Forgejo flavour.
#[derive(Debug, Clone)]
pub struct GitHub {
    api: ApiClient,
    base_url: String,
}

impl GitHub {
    /// Client against `base_url`, e.g. `https://api.github.com` or
    /// `https://codeberg.org/api/v1`.
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            api: ApiClient::new(client),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ReleaseProvider for GitHub {
    async fn get_repo(&self, user: &str, repo: &str, token: &str) -> Result<RepoInfo> {
        let url = format!("{}/repos/{user}/{repo}", self.base_url);
        let res: GhRepo = self.api.get(&url, token).await?;
        Ok(RepoInfo {
            private: res.private,
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

        let releases_url = format!("{}/repos/{user}/{repo}/releases", self.base_url);
        let resp: GhRelease = if release.is_empty() || release == "latest" {
            self.api.get(&format!("{releases_url}/latest"), token).await?
        } else {
            let url = format!("{releases_url}/tags/{release}");
            match self.api.get(&url, token).await {
                Err(Error::NotFound { .. }) => {
                    return Err(Error::ReleaseNotFound(release.to_string()));
                }
                other => other?,
            }
        };

        Ok(Release {
            version: resp.tag_name,
            assets: resp.assets.into_iter().map(ReleaseAsset::from).collect(),
        })
    }
}
