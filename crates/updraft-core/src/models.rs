//! Data shapes exchanged between the backend, the orchestrator and the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A downloadable file belonging to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFileInfo {
    /// Download URL.
    pub url: String,
    /// File name (e.g. "App-1.2.0-x86_64.AppImage").
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Expected SHA-256 digest (lowercase hex), when published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Release described by the update feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateInfo {
    /// Version without a leading "v".
    pub version: String,
    /// Release name/title.
    pub release_name: Option<String>,
    /// Changelog/release notes.
    pub release_notes: Option<String>,
    /// When the release was published.
    pub release_date: Option<DateTime<Utc>>,
    /// Files attached to the release for this platform.
    pub files: Vec<UpdateFileInfo>,
}

impl UpdateInfo {
    /// Creates release info with only a version set.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            release_name: None,
            release_notes: None,
            release_date: None,
            files: Vec::new(),
        }
    }
}

/// Raw result of an update check, returned to `check-update` callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheckResult {
    /// Whether the feed offers a version this build should move to.
    pub is_update_available: bool,
    /// The release the feed currently advertises.
    pub version_info: UpdateInfo,
    /// Version of the running application.
    pub current_version: String,
}

/// Download progress metrics, forwarded to the UI unmodified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressInfo {
    /// Total bytes to download (0 when unknown).
    pub total: u64,
    /// Bytes received since the previous tick.
    pub delta: u64,
    /// Bytes received so far.
    pub transferred: u64,
    /// Progress as a percentage (0.0 - 100.0).
    pub percent: f64,
    /// Average download speed.
    pub bytes_per_second: u64,
}

impl ProgressInfo {
    /// Builds a tick, deriving the percentage from `transferred / total`.
    pub fn new(total: u64, delta: u64, transferred: u64, bytes_per_second: u64) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            ((transferred as f64 / total as f64) * 100.0).min(100.0)
        };
        Self {
            total,
            delta,
            transferred,
            percent,
            bytes_per_second,
        }
    }
}

/// Availability notice pushed to the window after each check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotification {
    /// Whether an update is available.
    pub update: bool,
    /// Running application version.
    pub version: String,
    /// Version advertised by the feed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_version: Option<String>,
}

/// Answer to the "install and restart?" question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallDialogResult {
    /// Quit now and run the installer.
    InstallAndRestart,
    /// Keep running; the update stays pending.
    Later,
}

/// Identity of the running application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppInfo {
    /// Display name, used in dialogs.
    pub name: String,
    /// Running version.
    pub version: String,
    /// Whether this is an installed/distributed build.
    pub is_packaged: bool,
}

impl AppInfo {
    /// Creates app info.
    pub fn new(name: impl Into<String>, version: impl Into<String>, is_packaged: bool) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            is_packaged,
        }
    }
}
