//! `updater.json` settings.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use updraft_core::OrchestratorConfig;
use updraft_github::GitHubFeedConfig;
use updraft_server::DEFAULT_PORT;

/// File name of the settings file inside the config directory.
pub const CONFIG_FILE_NAME: &str = "updater.json";

/// Periodic check interval in seconds (24 hours).
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 86400;

/// Errors that can occur while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Updater settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UpdaterConfig {
    /// Application name shown in dialogs.
    pub app_name: String,

    /// Release feed.
    pub feed: GitHubFeedConfig,

    /// Orchestrator behaviour.
    pub orchestrator: OrchestratorConfig,

    /// Run the background update flow at startup.
    pub check_on_startup: bool,

    /// Seconds between background checks after startup (0 disables).
    pub check_interval_secs: u64,

    /// Treat this build as packaged regardless of detection.
    pub force_packaged: bool,

    /// Port of the local API.
    pub port: u16,

    /// Show a desktop notification when an update finishes downloading.
    pub notifications: bool,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            app_name: "Updraft".to_string(),
            feed: GitHubFeedConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            check_on_startup: true,
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            force_packaged: false,
            port: DEFAULT_PORT,
            notifications: true,
        }
    }
}

impl UpdaterConfig {
    /// Default location: `<config_dir>/updater.json`.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "updraft", "Updraft")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Loads settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = ?path, "No settings file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = UpdaterConfig::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(config, UpdaterConfig::default());
        assert_eq!(config.port, DEFAULT_PORT);
        assert!(config.check_on_startup);
        assert!(config.notifications);
    }

    #[test]
    fn notifications_can_be_turned_off() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, r#"{"notifications": false}"#).unwrap();

        let config = UpdaterConfig::load(&path).unwrap();
        assert!(!config.notifications);
        assert!(config.check_on_startup);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"{
                "app_name": "Rocket",
                "feed": {"repo_owner": "acme", "repo_name": "rocket"},
                "orchestrator": {"auto_download": false},
                "force_packaged": true
            }"#,
        )
        .unwrap();

        let config = UpdaterConfig::load(&path).unwrap();
        assert_eq!(config.app_name, "Rocket");
        assert_eq!(config.feed.repo_owner, "acme");
        assert!(!config.orchestrator.auto_download);
        assert!(config.orchestrator.prompt_on_downloaded);
        assert!(config.force_packaged);
        assert_eq!(config.check_interval_secs, DEFAULT_CHECK_INTERVAL_SECS);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            UpdaterConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }
}
