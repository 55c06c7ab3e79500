//! installer - serves one-line install scripts for release binaries
//!
//! `curl https://host/user/repo | sh` resolves the latest release of
//! `user/repo`, picks one asset per platform and answers with a script that
//! downloads the right one. Browsers get a plain-text summary instead.

pub mod config;
pub mod http;
pub mod render;

use std::sync::Arc;

use anyhow::{Context, Result};
use installer_core::{Installer, ResultCache, USER_AGENT};
use installer_core::cache::SystemClock;

pub use config::Config;
pub use http::AppState;

/// Build the application for `config`.
///
/// # Errors
///
/// Fails if the HTTP client cannot be constructed.
pub fn app(config: &Config) -> Result<axum::Router> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(config.upstream_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let cache = ResultCache::new(config.cache_ttl(), Arc::new(SystemClock));
    let installer = Installer::new(client, config.endpoints(), cache);
    let state = AppState::new(installer, config.router_config(), config.landing_url.clone())?;
    Ok(http::router(Arc::new(state)))
}
