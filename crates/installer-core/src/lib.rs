//! Release resolution for the installer service.
//!
//! A request path is parsed by [`router`], dispatched to a
//! [`provider::ReleaseProvider`], filtered by [`resolver`] and memoized in
//! [`cache::ResultCache`]. [`Installer`] ties the steps together.

pub mod cache;
pub mod error;
pub mod installer;
pub mod provider;
pub mod resolver;
pub mod router;

pub use cache::ResultCache;
pub use error::{Error, ErrorKind, Result};
pub use installer::Installer;
pub use provider::{ProviderEndpoints, ProviderKind, ReleaseProvider};
pub use router::{RequestParams, Route, Routed, RouterConfig};

/// User Agent string for upstream API calls
pub const USER_AGENT: &str = concat!("installer/", env!("CARGO_PKG_VERSION"));
