//! Turns a provider's raw asset list into one installable asset per platform.

use std::collections::HashSet;

use installer_schema::asset_pattern::{arch_of, extension_class, os_of};
use installer_schema::{ArchiveType, Asset, Os, Query, ReleaseAsset};
use tracing::debug;

use crate::error::{Error, Result};

/// Unsuffixed files larger than this are assumed to be bare executables.
pub const BARE_BINARY_MIN_SIZE: u64 = 1024 * 1024;

/// Filter, tag and deduplicate `raw` for `query`.
///
/// Assets are kept in provider order; the first asset seen for an
/// `os/arch` pair wins.
///
/// # Errors
///
/// [`Error::NoAssetsFound`] when `raw` is empty, [`Error::NoDownloadsFound`]
/// when nothing survives filtering.
pub fn filter_assets(raw: Vec<ReleaseAsset>, query: &Query) -> Result<Vec<Asset>> {
    if raw.is_empty() {
        return Err(Error::NoAssetsFound);
    }

    let authenticated = query.private && !query.token.is_empty();
    let includes = include_patterns(&query.include);
    let mut seen = HashSet::new();
    let mut assets = Vec::new();

    for ra in raw {
        let Some(kind) = classify(&ra) else {
            debug!(name = %ra.name, "fetched asset has unsupported file type");
            continue;
        };

        if !includes.is_empty() && !includes.iter().any(|inc| ra.name.contains(inc)) {
            debug!(name = %ra.name, "fetched asset excluded by include filter");
            continue;
        }

        let (Some(os), Some(arch)) = (os_of(&ra.name), arch_of(&ra.name)) else {
            debug!(name = %ra.name, "fetched asset has unknown os or arch");
            continue;
        };
        if os == Os::Windows {
            debug!(name = %ra.name, "fetched asset is for windows");
            continue;
        }

        if !seen.insert((os, arch)) {
            debug!(name = %ra.name, "duplicate {os}/{arch} asset skipped");
            continue;
        }

        debug!(name = %ra.name, "fetched asset");
        let url = if authenticated {
            ra.api_url.clone()
        } else {
            ra.download_url
        };
        assets.push(Asset {
            name: ra.name,
            size: ra.size,
            url,
            api_url: ra.api_url,
            os,
            arch,
            kind,
        });
    }

    if assets.is_empty() {
        return Err(Error::NoDownloadsFound);
    }
    Ok(assets)
}

fn classify(asset: &ReleaseAsset) -> Option<ArchiveType> {
    extension_class(&asset.name)
        .or_else(|| (asset.size > BARE_BINARY_MIN_SIZE).then_some(ArchiveType::Bin))
}

fn include_patterns(include: &str) -> Vec<&str> {
    include
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use installer_schema::Arch;

    fn raw(name: &str, size: u64) -> ReleaseAsset {
        ReleaseAsset {
            name: name.to_string(),
            size,
            download_url: format!("https://example.com/download/{name}"),
            api_url: format!("https://api.example.com/assets/{name}"),
        }
    }

    fn names(assets: &[Asset]) -> Vec<&str> {
        assets.iter().map(|a| a.name.as_str()).collect()
    }

    #[test]
    fn test_empty_input_is_no_assets() {
        let err = filter_assets(vec![], &Query::default()).unwrap_err();
        assert!(matches!(err, Error::NoAssetsFound));
    }

    #[test]
    fn test_filtered_to_empty_is_no_downloads() {
        let err = filter_assets(
            vec![raw("checksums.txt", 512), raw("tool.deb", 5_000_000)],
            &Query::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoDownloadsFound));
    }

    #[test]
    fn test_first_asset_per_platform_wins() {
        let assets = filter_assets(
            vec![
                raw("tool_linux_amd64.tar.gz", 100),
                raw("tool_linux_amd64_musl.tar.gz", 100),
                raw("tool_darwin_arm64.zip", 100),
                raw("tool-x86_64-unknown-linux-gnu.tar.xz", 100),
            ],
            &Query::default(),
        )
        .unwrap();

        assert_eq!(
            names(&assets),
            vec!["tool_linux_amd64.tar.gz", "tool_darwin_arm64.zip"]
        );
        assert_eq!(assets[0].kind, ArchiveType::TarGz);
        assert_eq!(assets[1].os, Os::Darwin);
        assert_eq!(assets[1].arch, Arch::Arm64);
    }

    #[test]
    fn test_include_is_or_over_substrings() {
        let query = Query {
            include: "linux,darwin".into(),
            ..Query::default()
        };
        let assets = filter_assets(
            vec![
                raw("tool_linux_amd64.tar.gz", 100),
                raw("tool_darwin_arm64.zip", 100),
                raw("tool_windows_amd64.zip", 100),
                raw("tool_freebsd_amd64.tar.gz", 100),
            ],
            &query,
        )
        .unwrap();
        assert_eq!(
            names(&assets),
            vec!["tool_linux_amd64.tar.gz", "tool_darwin_arm64.zip"]
        );
    }

    #[test]
    fn test_include_can_pick_variant() {
        let query = Query {
            include: "musl".into(),
            ..Query::default()
        };
        let assets = filter_assets(
            vec![
                raw("tool_linux_amd64.tar.gz", 100),
                raw("tool_linux_amd64_musl.tar.gz", 100),
            ],
            &query,
        )
        .unwrap();
        assert_eq!(names(&assets), vec!["tool_linux_amd64_musl.tar.gz"]);
    }

    #[test]
    fn test_large_unsuffixed_file_is_binary() {
        let assets = filter_assets(
            vec![
                raw("tool_linux_arm64", BARE_BINARY_MIN_SIZE + 1),
                raw("tool_linux_amd64", BARE_BINARY_MIN_SIZE),
            ],
            &Query::default(),
        )
        .unwrap();
        assert_eq!(names(&assets), vec!["tool_linux_arm64"]);
        assert_eq!(assets[0].kind, ArchiveType::Bin);
    }

    #[test]
    fn test_windows_and_unknown_platforms_dropped() {
        let err = filter_assets(
            vec![
                raw("tool_windows_amd64.zip", 100),
                raw("tool_linux.tar.gz", 100),
                raw("tool_amd64.tar.gz", 100),
            ],
            &Query::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NoDownloadsFound));
    }

    #[test]
    fn test_private_repo_uses_api_url_with_token() {
        let mut query = Query {
            private: true,
            token: "secret".into(),
            ..Query::default()
        };
        let assets = filter_assets(vec![raw("tool_linux_amd64.tar.gz", 100)], &query).unwrap();
        assert_eq!(
            assets[0].url,
            "https://api.example.com/assets/tool_linux_amd64.tar.gz"
        );

        query.token.clear();
        let assets = filter_assets(vec![raw("tool_linux_amd64.tar.gz", 100)], &query).unwrap();
        assert_eq!(
            assets[0].url,
            "https://example.com/download/tool_linux_amd64.tar.gz"
        );
    }
}
