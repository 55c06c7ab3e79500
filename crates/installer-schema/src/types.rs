//! Request, asset and release records shared by the resolver and the renderers.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::asset_pattern::{Arch, ArchiveType, Os};

/// Everything a single install request asks for.
///
/// A `Query` is built once per request by the router and never changes after
/// the repository visibility has been filled in. It doubles as the cache key
/// seed and as template data for the rendered script.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Query {
    /// Repository owner.
    pub user: String,
    /// Repository (and default binary) name.
    pub program: String,
    /// Name to install the binary as, if different from `program`.
    pub as_program: String,
    /// Requested release tag, `latest` when none was given.
    pub release: String,
    /// Comma-separated filename substrings an asset must contain one of.
    pub include: String,
    /// Architecture hint from the request. Not used for filtering.
    pub arch: String,
    /// Bearer token forwarded to the provider.
    pub token: String,
    /// Target platform of the script (`linux`, `windows`, ...).
    pub platform: String,
    /// API base URL of the provider the request was routed to.
    pub provider_url: String,
    /// Move the binary onto the `PATH` after download.
    pub move_to_path: bool,
    /// Skip TLS verification when downloading.
    pub insecure: bool,
    /// Whether the repository is private.
    pub private: bool,
}

impl Query {
    /// Name the installed binary should end up with.
    pub fn binary_name(&self) -> &str {
        if self.as_program.is_empty() {
            &self.program
        } else {
            &self.as_program
        }
    }

    /// Whether the request asked for the newest release.
    pub fn wants_latest(&self) -> bool {
        self.release.is_empty() || self.release == "latest"
    }

    /// Deterministic cache key: SHA-256 over the JSON encoding, base64 encoded.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be serialized.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let mut hasher = Sha256::new();
        serde_json::to_writer(&mut hasher, self)?;
        Ok(STANDARD.encode(hasher.finalize()))
    }
}

/// Repository metadata needed before resolving assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RepoInfo {
    /// Private repositories need authenticated download URLs.
    pub private: bool,
}

/// A release file exactly as the provider API reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    /// File name.
    pub name: String,
    /// Size in bytes (0 when the provider does not report it).
    pub size: u64,
    /// Public browser download URL.
    pub download_url: String,
    /// API URL of the asset, usable with a token for private repositories.
    pub api_url: String,
}

/// A release file that survived filtering, tagged with its platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// File name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// URL the install script downloads from.
    pub url: String,
    /// API URL of the asset.
    pub api_url: String,
    /// Detected operating system.
    pub os: Os,
    /// Detected architecture.
    pub arch: Arch,
    /// Detected archive format.
    #[serde(rename = "type")]
    pub kind: ArchiveType,
}

impl Asset {
    /// `os/arch` pair that identifies one platform slot.
    pub fn key(&self) -> (Os, Arch) {
        (self.os, self.arch)
    }

    /// `macOS/arm64` style label.
    pub fn display_key(&self) -> String {
        format!("{}/{}", self.os.display_name(), self.arch)
    }

    /// Apple silicon build.
    pub fn is_mac_m1(&self) -> bool {
        self.os == Os::Darwin && self.arch == Arch::Arm64
    }
}

/// The outcome of resolving one [`Query`]; what the renderers consume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRelease {
    /// The query that produced this release.
    #[serde(flatten)]
    pub query: Query,
    /// When resolution happened; the only staleness signal for the cache.
    pub timestamp: DateTime<Utc>,
    /// Tag the provider actually resolved (e.g. `latest` → `v2.0.13`).
    pub version: String,
    /// One asset per `os/arch` pair, in provider order.
    pub assets: Vec<Asset>,
    /// Whether a macOS/arm64 asset is present.
    pub m1_asset: bool,
}

impl ResolvedRelease {
    /// Assemble a result, deriving the Apple silicon flag from `assets`.
    pub fn new(query: Query, timestamp: DateTime<Utc>, version: String, assets: Vec<Asset>) -> Self {
        let m1_asset = assets.iter().any(Asset::is_mac_m1);
        Self {
            query,
            timestamp,
            version,
            assets,
            m1_asset,
        }
    }
}
