//! Configuration for the GitHub Releases feed.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default GitHub API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Default repository for updates.
pub const DEFAULT_REPO_OWNER: &str = "updraft";
pub const DEFAULT_REPO_NAME: &str = "updraft";

/// Configuration for [`GitHubBackend`](crate::GitHubBackend).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubFeedConfig {
    /// GitHub repository owner.
    pub repo_owner: String,

    /// GitHub repository name.
    pub repo_name: String,

    /// API base URL (GitHub Enterprise installs use their own).
    pub api_base: String,

    /// Whether to offer pre-release versions.
    pub allow_prerelease: bool,

    /// Whether a lower feed version counts as an update.
    pub allow_downgrade: bool,

    /// Where installers are downloaded. `None` uses the system temp dir.
    pub download_dir: Option<PathBuf>,

    /// Asset name patterns overriding the built-in platform patterns.
    pub asset_patterns: Option<Vec<String>>,

    /// Version of the running application.
    #[serde(skip)]
    pub current_version: String,
}

impl Default for GitHubFeedConfig {
    fn default() -> Self {
        Self {
            repo_owner: DEFAULT_REPO_OWNER.to_string(),
            repo_name: DEFAULT_REPO_NAME.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            allow_prerelease: false,
            allow_downgrade: false,
            download_dir: None,
            asset_patterns: None,
            current_version: "0.0.0".to_string(),
        }
    }
}

impl GitHubFeedConfig {
    /// Create a config with the required fields.
    pub fn new(
        repo_owner: impl Into<String>,
        repo_name: impl Into<String>,
        current_version: impl Into<String>,
    ) -> Self {
        Self {
            repo_owner: repo_owner.into(),
            repo_name: repo_name.into(),
            current_version: current_version.into(),
            ..Self::default()
        }
    }

    /// Set the running version.
    pub fn current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }

    /// Set the download directory.
    pub fn download_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(path.into());
        self
    }

    /// Include or exclude pre-releases.
    pub fn allow_prerelease(mut self, allow: bool) -> Self {
        self.allow_prerelease = allow;
        self
    }

    /// Allow or forbid downgrades.
    pub fn allow_downgrade(mut self, allow: bool) -> Self {
        self.allow_downgrade = allow;
        self
    }

    /// URL of the latest stable release.
    pub fn latest_release_url(&self) -> String {
        format!("{}/latest", self.releases_url())
    }

    /// URL of the release list.
    pub fn releases_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_base.trim_end_matches('/'),
            self.repo_owner,
            self.repo_name
        )
    }

    /// Effective download directory.
    pub fn resolved_download_dir(&self) -> PathBuf {
        self.download_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(format!("{}-updates", self.repo_name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_urls() {
        let config = GitHubFeedConfig::new("acme", "rocket", "1.0.0");
        assert_eq!(
            config.latest_release_url(),
            "https://api.github.com/repos/acme/rocket/releases/latest"
        );

        let mut enterprise = config.clone();
        enterprise.api_base = "https://git.example.com/api/v3/".to_string();
        assert_eq!(
            enterprise.releases_url(),
            "https://git.example.com/api/v3/repos/acme/rocket/releases"
        );
    }

    #[test]
    fn download_dir_defaults_to_temp() {
        let config = GitHubFeedConfig::new("acme", "rocket", "1.0.0");
        assert!(config.resolved_download_dir().ends_with("rocket-updates"));

        let config = config.download_dir("/var/cache/rocket");
        assert_eq!(
            config.resolved_download_dir(),
            PathBuf::from("/var/cache/rocket")
        );
    }

    #[test]
    fn current_version_is_not_read_from_files() {
        let config: GitHubFeedConfig =
            serde_json::from_str(r#"{"repo_owner": "acme", "current_version": "9.9.9"}"#).unwrap();
        assert_eq!(config.repo_owner, "acme");
        assert_eq!(config.repo_name, DEFAULT_REPO_NAME);
        assert_eq!(config.current_version, "0.0.0");
    }
}
