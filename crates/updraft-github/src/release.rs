//! GitHub release payloads and the rules for picking one.

use chrono::{DateTime, Utc};
use semver::Version;
use serde::Deserialize;

use updraft_core::{UpdateError, UpdateFileInfo, UpdateInfo};

/// Names of checksum manifests looked up in a release (lowercase).
const CHECKSUM_ASSETS: &[&str] = &["checksums.txt", "sha256sums", "sha256sums.txt"];

/// A GitHub release.
#[derive(Debug, Clone, Deserialize)]
pub struct GitHubRelease {
    pub tag_name: String,
    pub name: Option<String>,
    pub body: Option<String>,
    pub html_url: String,
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub prerelease: bool,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub assets: Vec<GitHubAsset>,
}

/// A release asset (downloadable file).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GitHubAsset {
    pub name: String,
    pub browser_download_url: String,
    pub size: u64,
    #[serde(default)]
    pub content_type: String,
}

impl GitHubRelease {
    /// Tag without the "v" prefix.
    pub fn version_str(&self) -> &str {
        self.tag_name.strip_prefix('v').unwrap_or(&self.tag_name)
    }

    /// Parsed release version.
    pub fn version(&self) -> Result<Version, UpdateError> {
        Version::parse(self.version_str())
            .map_err(|e| UpdateError::VersionParse(format!("{}: {}", self.tag_name, e)))
    }

    /// Finds the first asset matching one of `patterns` (checked in order,
    /// case-insensitive).
    pub fn find_compatible_asset<S: AsRef<str>>(&self, patterns: &[S]) -> Option<&GitHubAsset> {
        patterns.iter().find_map(|pattern| {
            let pattern = pattern.as_ref().to_lowercase();
            self.assets
                .iter()
                .find(|asset| asset.name.to_lowercase().contains(&pattern))
        })
    }

    /// Finds the checksum manifest, if the release publishes one.
    pub fn checksum_asset(&self) -> Option<&GitHubAsset> {
        self.assets
            .iter()
            .find(|asset| CHECKSUM_ASSETS.contains(&asset.name.to_lowercase().as_str()))
    }

    /// Converts to the backend-neutral release description.
    pub fn to_update_info(&self, asset: Option<&GitHubAsset>) -> UpdateInfo {
        UpdateInfo {
            version: self.version_str().to_string(),
            release_name: self.name.clone(),
            release_notes: self.body.clone(),
            release_date: self.published_at,
            files: asset
                .map(|a| {
                    vec![UpdateFileInfo {
                        url: a.browser_download_url.clone(),
                        name: a.name.clone(),
                        size: a.size,
                        sha256: None,
                    }]
                })
                .unwrap_or_default(),
        }
    }
}

/// Picks the newest usable release from a list ordered newest-first.
pub fn select_release(
    releases: Vec<GitHubRelease>,
    allow_prerelease: bool,
) -> Option<GitHubRelease> {
    releases
        .into_iter()
        .find(|r| !r.draft && (allow_prerelease || !r.prerelease))
}

/// Whether `candidate` should replace `current`.
pub fn is_update_available(current: &Version, candidate: &Version, allow_downgrade: bool) -> bool {
    if allow_downgrade {
        candidate != current
    } else {
        candidate > current
    }
}

/// Looks up the digest for `asset_name` in a `sha256sum`-style manifest
/// ("<hash>  <name>" or "<hash> *<name>").
pub fn parse_checksum(manifest: &str, asset_name: &str) -> Option<String> {
    manifest.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        let hash = parts.next()?;
        let name = parts.next()?.trim_start_matches('*');
        (name == asset_name).then(|| hash.to_lowercase())
    })
}

/// Returns asset name patterns for the current platform.
pub fn platform_asset_patterns() -> Vec<&'static str> {
    #[cfg(target_os = "macos")]
    {
        #[cfg(target_arch = "aarch64")]
        {
            vec!["macos-arm64.dmg", "darwin-arm64", "aarch64-apple-darwin", ".dmg"]
        }
        #[cfg(target_arch = "x86_64")]
        {
            vec!["macos-x64.dmg", "darwin-x64", "x86_64-apple-darwin", ".dmg"]
        }
        #[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
        {
            vec!["macos", "darwin"]
        }
    }

    #[cfg(target_os = "windows")]
    {
        vec!["windows-x64.msi", "windows-x64.exe", "setup.exe", ".msi"]
    }

    #[cfg(target_os = "linux")]
    {
        vec![
            "linux-x64.appimage",
            "x86_64.appimage",
            "linux-x64.deb",
            "amd64.deb",
            ".appimage",
        ]
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
    {
        vec![]
    }
}
