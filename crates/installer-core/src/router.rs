//! Request path parsing: `/[provider/]user/repo[@release]` into a [`Query`].

use std::collections::HashMap;

use installer_schema::Query;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::provider::{ProviderEndpoints, ProviderKind};

/// Path prefixes recognized as an explicit provider.
pub const KNOWN_PROVIDERS: &[&str] = &["github", "codeberg", "forgejo"];

/// Operator settings the router consults.
#[derive(Debug, Clone, Default)]
pub struct RouterConfig {
    /// Owner used when the path only names a program.
    pub default_user: String,
    /// Provider used for dispatch whenever set, see [`route`].
    pub default_provider: Option<String>,
    /// Exact `user/repo` path → provider name overrides.
    pub repo_providers: HashMap<String, String>,
    /// API base URLs per provider.
    pub endpoints: ProviderEndpoints,
}

/// Query-string parameters of an install request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestParams {
    /// `script` or `text`.
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Target platform of the script, `linux` by default.
    pub platform: Option<String>,
    /// Install the binary under another name.
    #[serde(rename = "as")]
    pub as_program: Option<String>,
    /// Comma-separated filename substrings.
    pub include: Option<String>,
    /// Architecture hint, passed through to templates.
    pub arch: Option<String>,
    /// `1` (default) moves the binary onto the `PATH`.
    #[serde(rename = "move")]
    pub move_to_path: Option<String>,
    /// `1` disables TLS verification in the script.
    pub insecure: Option<String>,
}

/// Where a request should go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// Empty path: send the visitor to the project page.
    Landing,
    /// Resolve and render an install script.
    Install(Route),
}

/// A parsed install request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// The request; `private` is still unset.
    pub query: Query,
    /// Provider whose client serves the request.
    pub provider: ProviderKind,
}

/// Parse a request path and its parameters.
///
/// `query.provider_url` follows the provider named by the path (or by the
/// repo override map), while [`Route::provider`] is replaced by
/// `default_provider` whenever one is configured. The two can disagree.
///
/// # Errors
///
/// [`Error::UnknownProvider`], [`Error::MissingProviderUrl`] or
/// [`Error::InvalidPath`].
pub fn route(
    path: &str,
    params: &RequestParams,
    token: Option<&str>,
    config: &RouterConfig,
) -> Result<Routed> {
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        return Ok(Routed::Landing);
    }

    let (detected, remainder) = detect_provider(path, config);
    let url_provider: ProviderKind = detected.parse()?;
    let provider_url = config.endpoints.api_base(url_provider)?;

    let explicit_prefix = remainder.len() != path.len();
    let target = split_target(remainder, &config.default_user, explicit_prefix)?;

    let provider = match config.default_provider.as_deref() {
        Some(name) if !name.trim().is_empty() => name.parse()?,
        _ => url_provider,
    };

    let query = Query {
        user: target.user.to_string(),
        program: target.program.to_string(),
        as_program: params.as_program.clone().unwrap_or_default(),
        release: target.release.to_string(),
        include: params.include.clone().unwrap_or_default(),
        arch: params.arch.clone().unwrap_or_default(),
        token: token.unwrap_or_default().to_string(),
        platform: params
            .platform
            .clone()
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| "linux".to_string()),
        provider_url,
        move_to_path: params
            .move_to_path
            .as_deref()
            .is_none_or(|m| m.is_empty() || m == "1"),
        insecure: params.insecure.as_deref() == Some("1"),
        private: false,
    };

    Ok(Routed::Install(Route { query, provider }))
}

/// Extract the bearer token from an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    header
        .split_once("Bearer ")
        .map(|(_, token)| token.trim())
        .filter(|t| !t.is_empty())
}

fn detect_provider<'a>(path: &'a str, config: &'a RouterConfig) -> (&'a str, &'a str) {
    if let Some((first, rest)) = path.split_once('/') {
        if KNOWN_PROVIDERS
            .iter()
            .any(|known| first.eq_ignore_ascii_case(known))
        {
            return (first, rest);
        }
        if let Some(mapped) = config.repo_providers.get(path) {
            return (mapped, path);
        }
    } else if KNOWN_PROVIDERS
        .iter()
        .any(|known| path.eq_ignore_ascii_case(known))
    {
        return (path, "");
    }

    match config.default_provider.as_deref() {
        Some(name) if !name.trim().is_empty() => (name, path),
        _ => ("github", path),
    }
}

struct Target<'a> {
    user: &'a str,
    program: &'a str,
    release: &'a str,
}

fn split_target<'a>(
    remainder: &'a str,
    default_user: &'a str,
    explicit_prefix: bool,
) -> Result<Target<'a>> {
    let (user, rest) = match remainder.split_once('/') {
        Some((user, rest)) if !rest.is_empty() => (user, rest),
        // `program` or `program/`: the owner comes from configuration.
        Some((program, _)) => (default_user, program),
        None => (default_user, remainder),
    };

    let (program, release) = rest.split_once('@').unwrap_or((rest, ""));

    // Without an explicit provider, a leftover slash means the first segment
    // was meant as one.
    if program.contains('/') {
        if explicit_prefix {
            return Err(Error::InvalidPath);
        }
        let prefix = remainder.split('/').next().unwrap_or_default();
        return Err(Error::UnknownProvider(prefix.to_string()));
    }
    if program.is_empty() || user.is_empty() {
        return Err(Error::InvalidPath);
    }

    Ok(Target {
        user,
        program,
        release: if release.is_empty() { "latest" } else { release },
    })
}
