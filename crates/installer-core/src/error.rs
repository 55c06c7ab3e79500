//! Error taxonomy for request routing and release resolution.

use thiserror::Error;

/// Coarse classification the HTTP layer maps to status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Empty or malformed program name.
    InvalidPath,
    /// Path or configuration named a provider we do not know.
    UnknownProvider,
    /// Forgejo selected but no instance URL configured.
    MissingProviderUrl,
    /// Repository or release does not exist upstream.
    UpstreamNotFound,
    /// Upstream answered with an unexpected status or could not be reached.
    UpstreamFailure,
    /// Resolution succeeded but nothing usable was attached to the release.
    NoAssets,
    /// A defect on our side.
    Internal,
}

/// Everything that can go wrong between a request path and a resolved release.
#[derive(Error, Debug)]
pub enum Error {
    /// The path names no program, or has a malformed owner or release.
    #[error("Invalid path - must specify program name")]
    InvalidPath,

    /// A provider name outside the supported set.
    #[error("Unknown provider: {0} (supported: github, codeberg, forgejo)")]
    UnknownProvider(String),

    /// Forgejo was selected without an instance URL.
    #[error("Provider URL is required for Forgejo")]
    MissingProviderUrl,

    /// Upstream answered 404.
    #[error("not found: {url}")]
    NotFound {
        /// The URL that was requested.
        url: String,
    },

    /// The requested release tag does not exist.
    #[error("release tag '{0}' not found")]
    ReleaseNotFound(String),

    /// The repository has no releases at all.
    #[error("no releases found")]
    NoReleases,

    /// Upstream answered with a status other than 200 or 404.
    #[error("{status} {body}")]
    UnexpectedStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, as text.
        body: String,
    },

    /// The request never produced a response.
    #[error("request failed: {url}: {source}")]
    Transport {
        /// The URL that was requested.
        url: String,
        /// Underlying client error.
        #[source]
        source: reqwest::Error,
    },

    /// The response body was not the expected JSON.
    #[error("decode failed: {url}: {source}")]
    Decode {
        /// The URL that was requested.
        url: String,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },

    /// The release has no attached files.
    #[error("no assets found")]
    NoAssetsFound,

    /// No attached file survived filtering.
    #[error("no downloads found for this release")]
    NoDownloadsFound,

    /// The query could not be serialized into a cache key.
    #[error("Failed to fingerprint query: {0}")]
    Fingerprint(#[source] serde_json::Error),
}

impl Error {
    /// The kind this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath => ErrorKind::InvalidPath,
            Self::UnknownProvider(_) => ErrorKind::UnknownProvider,
            Self::MissingProviderUrl => ErrorKind::MissingProviderUrl,
            Self::NotFound { .. } | Self::ReleaseNotFound(_) | Self::NoReleases => {
                ErrorKind::UpstreamNotFound
            }
            Self::UnexpectedStatus { .. } | Self::Transport { .. } | Self::Decode { .. } => {
                ErrorKind::UpstreamFailure
            }
            Self::NoAssetsFound | Self::NoDownloadsFound => ErrorKind::NoAssets,
            Self::Fingerprint(_) => ErrorKind::Internal,
        }
    }
}

/// Result alias defaulting to [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::InvalidPath.kind(), ErrorKind::InvalidPath);
        assert_eq!(
            Error::ReleaseNotFound("v1".into()).kind(),
            ErrorKind::UpstreamNotFound
        );
        assert_eq!(Error::NoReleases.kind(), ErrorKind::UpstreamNotFound);
        assert_eq!(
            Error::UnexpectedStatus {
                status: 500,
                body: "boom".into()
            }
            .kind(),
            ErrorKind::UpstreamFailure
        );
        assert_eq!(Error::NoDownloadsFound.kind(), ErrorKind::NoAssets);
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            Error::ReleaseNotFound("v0.0.12".into()).to_string(),
            "release tag 'v0.0.12' not found"
        );
        assert!(
            Error::UnknownProvider("bogus".into())
                .to_string()
                .contains("bogus")
        );
    }
}
