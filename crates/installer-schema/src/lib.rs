//! Shared types for the installer service.
//!
//! [`Query`] describes what a request asks for, [`ReleaseAsset`] is a raw
//! provider record, and [`ResolvedRelease`] is what the renderers consume.
//! Filename heuristics live in [`asset_pattern`].

pub mod asset_pattern;
pub mod types;

// Re-exports
pub use asset_pattern::{Arch, ArchiveType, Os};
pub use types::*;
