//! Notifications emitted by the backend and events pushed to the window.

use serde_json::Value;

use crate::error::{ErrorDetail, ErrorPayload};
use crate::models::{ProgressInfo, UpdateInfo, UpdateNotification};

/// Life-cycle notification emitted by an update backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// A check has started.
    CheckingForUpdate,
    /// The feed offers a newer version.
    UpdateAvailable(UpdateInfo),
    /// The running version is current.
    UpdateNotAvailable(UpdateInfo),
    /// Download progress tick.
    DownloadProgress(ProgressInfo),
    /// The update is downloaded and verified.
    UpdateDownloaded(UpdateInfo),
    /// Checking or downloading failed.
    Error(ErrorDetail),
}

impl BackendEvent {
    /// Name of the notification, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CheckingForUpdate => "checking-for-update",
            Self::UpdateAvailable(_) => "update-available",
            Self::UpdateNotAvailable(_) => "update-not-available",
            Self::DownloadProgress(_) => "download-progress",
            Self::UpdateDownloaded(_) => "update-downloaded",
            Self::Error(_) => "error",
        }
    }
}

/// Channel carrying availability notices.
pub const CHANNEL_UPDATE_CAN_AVAILABLE: &str = "update-can-available";
/// Channel carrying progress ticks.
pub const CHANNEL_DOWNLOAD_PROGRESS: &str = "download-progress";
/// Channel signalling a finished download.
pub const CHANNEL_UPDATE_DOWNLOADED: &str = "update-downloaded";
/// Channel carrying `{message, error}` pairs.
pub const CHANNEL_UPDATE_ERROR: &str = "update-error";

/// Fire-and-forget event pushed to the application window.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    UpdateCanAvailable(UpdateNotification),
    DownloadProgress(ProgressInfo),
    UpdateDownloaded,
    UpdateError(ErrorPayload),
}

impl WindowEvent {
    /// Channel name the UI listens on.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::UpdateCanAvailable(_) => CHANNEL_UPDATE_CAN_AVAILABLE,
            Self::DownloadProgress(_) => CHANNEL_DOWNLOAD_PROGRESS,
            Self::UpdateDownloaded => CHANNEL_UPDATE_DOWNLOADED,
            Self::UpdateError(_) => CHANNEL_UPDATE_ERROR,
        }
    }

    /// JSON payload (`null` for `update-downloaded`).
    pub fn payload(&self) -> Value {
        let value = match self {
            Self::UpdateCanAvailable(n) => serde_json::to_value(n),
            Self::DownloadProgress(p) => serde_json::to_value(p),
            Self::UpdateDownloaded => Ok(Value::Null),
            Self::UpdateError(e) => serde_json::to_value(e),
        };
        value.unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UpdateError;

    #[test]
    fn channel_names() {
        assert_eq!(WindowEvent::UpdateDownloaded.channel(), "update-downloaded");
        assert_eq!(
            WindowEvent::DownloadProgress(ProgressInfo::default()).channel(),
            "download-progress"
        );
        let payload = ErrorPayload::from_error(&UpdateError::InProgress);
        assert_eq!(WindowEvent::UpdateError(payload).channel(), "update-error");
    }

    #[test]
    fn error_payload_json() {
        let payload = ErrorPayload::from_error(&UpdateError::Network("reset".into()));
        let value = WindowEvent::UpdateError(payload).payload();
        assert_eq!(value["message"], "network error: reset");
        assert_eq!(value["error"]["kind"], "network");
        assert!(WindowEvent::UpdateDownloaded.payload().is_null());
    }
}
