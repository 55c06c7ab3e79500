//! Command-line and environment configuration.

use std::collections::HashMap;
use std::time::Duration;

use chrono::TimeDelta;
use clap::Parser;
use installer_core::provider::{DEFAULT_CODEBERG_API, DEFAULT_GITHUB_API};
use installer_core::{ProviderEndpoints, RouterConfig};

/// Server settings. Every flag can also be set through its environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "installer")]
#[command(author, version, about = "Serves one-line install scripts for release binaries")]
pub struct Config {
    /// Interface to listen on
    #[arg(long, env = "HTTP_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Owner used when a path only names a program
    #[arg(long, env = "DEFAULT_USER", default_value = "")]
    pub default_user: String,

    /// Provider serving every request (github, codeberg, forgejo)
    #[arg(long, env = "PROVIDER")]
    pub provider: Option<String>,

    /// Forgejo instance URL, e.g. https://git.example.com
    #[arg(long, env = "PROVIDER_URL")]
    pub provider_url: Option<String>,

    /// Per-repository provider overrides: user/repo=provider[,...]
    #[arg(
        long = "repo-provider",
        env = "REPO_PROVIDER_MAP",
        value_delimiter = ',',
        value_parser = parse_repo_provider
    )]
    pub repo_providers: Vec<(String, String)>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API)]
    pub github_api: String,

    /// Codeberg API base URL
    #[arg(long, env = "CODEBERG_API_URL", default_value = DEFAULT_CODEBERG_API)]
    pub codeberg_api: String,

    /// Seconds a resolved release is served from memory
    #[arg(long, env = "CACHE_TTL_SECS", default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    /// Timeout for each upstream API call, in seconds
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 30)]
    pub upstream_timeout_secs: u64,

    /// Where requests for `/` are redirected
    #[arg(long, env = "LANDING_URL", default_value = env!("CARGO_PKG_REPOSITORY"))]
    pub landing_url: String,

    /// Log filter, e.g. `info` or `installer_core=debug` (falls back to RUST_LOG)
    #[arg(long, env = "LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Config {
    /// `host:port` to bind.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// API base URLs per provider.
    pub fn endpoints(&self) -> ProviderEndpoints {
        ProviderEndpoints {
            github: self.github_api.clone(),
            codeberg: self.codeberg_api.clone(),
            forgejo: self.provider_url.clone().filter(|u| !u.trim().is_empty()),
        }
    }

    /// Settings for the path router.
    pub fn router_config(&self) -> RouterConfig {
        RouterConfig {
            default_user: self.default_user.clone(),
            default_provider: self.provider.clone().filter(|p| !p.trim().is_empty()),
            repo_providers: self.repo_providers.iter().cloned().collect::<HashMap<_, _>>(),
            endpoints: self.endpoints(),
        }
    }

    /// Cache TTL.
    pub fn cache_ttl(&self) -> TimeDelta {
        i64::try_from(self.cache_ttl_secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Upstream request timeout.
    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.upstream_timeout_secs)
    }
}

fn parse_repo_provider(entry: &str) -> Result<(String, String), String> {
    let (repo, provider) = entry
        .split_once('=')
        .ok_or_else(|| format!("expected user/repo=provider, got '{entry}'"))?;
    let (repo, provider) = (repo.trim(), provider.trim());
    if repo.is_empty() || provider.is_empty() {
        return Err(format!("expected user/repo=provider, got '{entry}'"));
    }
    Ok((repo.to_string(), provider.to_lowercase()))
}
