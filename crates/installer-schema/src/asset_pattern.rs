//! Best-effort platform detection from release asset filenames.
//! Vendors name the same target many ways: macos/darwin/osx, arm64/aarch64/armv8, etc.

use serde::{Deserialize, Serialize};

/// Operating system a release asset was built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    /// Linux-based operating systems.
    Linux,
    /// macOS, under its kernel name.
    Darwin,
    /// Microsoft Windows.
    Windows,
    /// FreeBSD.
    FreeBsd,
    /// OpenBSD.
    OpenBsd,
}

impl Os {
    /// Canonical lowercase name, as used by the install scripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Windows => "windows",
            Self::FreeBsd => "freebsd",
            Self::OpenBsd => "openbsd",
        }
    }

    /// Human-facing name (`macOS` instead of `darwin`).
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Darwin => "macOS",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for Os {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture a release asset was built for, in Go naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Arch {
    /// Intel/AMD 64-bit (`x86_64`, `x64`).
    #[serde(rename = "amd64")]
    Amd64,
    /// ARM 64-bit (`aarch64`, `armv8`).
    #[serde(rename = "arm64")]
    Arm64,
    /// Intel 32-bit (`i386`, `x86`).
    #[serde(rename = "386")]
    I386,
    /// 32-bit ARM (`armv6`, `armv7`).
    #[serde(rename = "arm")]
    Arm,
}

impl Arch {
    /// Canonical name, as used by the install scripts.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::I386 => "386",
            Self::Arm => "arm",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Archive or binary format the install scripts know how to unpack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchiveType {
    /// Standalone executable without a recognized suffix.
    #[serde(rename = ".bin")]
    Bin,
    /// Zip archive.
    #[serde(rename = ".zip")]
    Zip,
    /// Bzip-compressed tarball (`.tar.bz`).
    #[serde(rename = ".tar.bz")]
    TarBz,
    /// Bzip2-compressed tarball.
    #[serde(rename = ".tar.bz2")]
    TarBz2,
    /// Bzip2-compressed single file.
    #[serde(rename = ".bz2")]
    Bz2,
    /// Gzip-compressed single file.
    #[serde(rename = ".gz")]
    Gz,
    /// Gzip-compressed tarball.
    #[serde(rename = ".tar.gz")]
    TarGz,
    /// Gzip-compressed tarball, short suffix.
    #[serde(rename = ".tgz")]
    Tgz,
    /// XZ-compressed tarball.
    #[serde(rename = ".tar.xz")]
    TarXz,
}

/// Recognized suffixes, compound ones ahead of their shorter tails.
const SUFFIXES: &[(&str, ArchiveType)] = &[
    (".tar.gz", ArchiveType::TarGz),
    (".tar.bz2", ArchiveType::TarBz2),
    (".tar.bz", ArchiveType::TarBz),
    (".tar.xz", ArchiveType::TarXz),
    (".tgz", ArchiveType::Tgz),
    (".zip", ArchiveType::Zip),
    (".gz", ArchiveType::Gz),
    (".bz2", ArchiveType::Bz2),
];

impl ArchiveType {
    /// The suffix this type is recognized by.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bin => ".bin",
            Self::Zip => ".zip",
            Self::TarBz => ".tar.bz",
            Self::TarBz2 => ".tar.bz2",
            Self::Bz2 => ".bz2",
            Self::Gz => ".gz",
            Self::TarGz => ".tar.gz",
            Self::Tgz => ".tgz",
            Self::TarXz => ".tar.xz",
        }
    }
}

impl std::fmt::Display for ArchiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a filename by its archive suffix, longest match first.
///
/// ```
/// use installer_schema::asset_pattern::{extension_class, ArchiveType};
///
/// assert_eq!(extension_class("tool.tar.gz"), Some(ArchiveType::TarGz));
/// assert_eq!(extension_class("tool.exe"), None);
/// ```
pub fn extension_class(name: &str) -> Option<ArchiveType> {
    let name = name.to_lowercase();
    SUFFIXES
        .iter()
        .find(|(suffix, _)| name.ends_with(suffix))
        .map(|(_, kind)| *kind)
}

/// Detect the target OS from a filename.
pub fn os_of(name: &str) -> Option<Os> {
    let f = name.to_lowercase();

    // "darwin" contains "win", so Apple tokens go first.
    if f.contains("darwin") || f.contains("macos") || f.contains("osx") {
        Some(Os::Darwin)
    } else if f.contains("linux") {
        Some(Os::Linux)
    } else if f.contains("freebsd") {
        Some(Os::FreeBsd)
    } else if f.contains("openbsd") {
        Some(Os::OpenBsd)
    } else if f.contains("windows") || f.contains("win") {
        Some(Os::Windows)
    } else {
        None
    }
}

/// OS names that some projects glue a bitness onto (`linux64`, `win32`).
const BITNESS_PREFIXES: &[&str] = &["linux", "win", "osx", "freebsd", "openbsd"];

fn has_bitness_suffix(f: &str, bits: &str) -> bool {
    BITNESS_PREFIXES
        .iter()
        .any(|os| f.contains(&format!("{os}{bits}")))
}

/// Detect the target architecture from a filename.
pub fn arch_of(name: &str) -> Option<Arch> {
    let f = name.to_lowercase();

    if f.contains("arm64") || f.contains("aarch64") || f.contains("armv8") {
        Some(Arch::Arm64)
    } else if f.contains("amd64") || f.contains("x86_64") || f.contains("x64") {
        Some(Arch::Amd64)
    } else if f.contains("386") || f.contains("x86") {
        Some(Arch::I386)
    } else if f.contains("arm") {
        Some(Arch::Arm)
    } else if has_bitness_suffix(&f, "64") {
        // only when no explicit arch token is present
        Some(Arch::Amd64)
    } else if has_bitness_suffix(&f, "32") {
        Some(Arch::I386)
    } else {
        None
    }
}
