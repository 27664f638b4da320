//! Error types for update operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Message used when a build that is not packaged asks for an update check.
pub const PACKAGING_MESSAGE: &str = "The update feature is only available after the package.";

/// Message reported to the UI when an update check fails.
pub const CHECK_FAILED_MESSAGE: &str = "Network error";

/// Errors that can occur during update operations.
#[derive(Debug, Clone, Error)]
pub enum UpdateError {
    /// Update checks are disabled outside packaged builds.
    #[error("The update feature is only available after the package.")]
    Packaging,

    /// Transport failure while talking to the update feed.
    #[error("network error: {0}")]
    Network(String),

    /// Failure inside the update backend (installer, feed format, ...).
    #[error("update backend error: {0}")]
    Library(String),

    /// Error reported asynchronously through a backend notification.
    #[error("{0}")]
    Backend(ErrorDetail),

    /// A download is already running.
    #[error("update already in progress")]
    InProgress,

    /// `quit_and_install` was called before any update was downloaded.
    #[error("no downloaded update to install")]
    NothingToInstall,

    /// The release carries no asset for this platform.
    #[error("no compatible asset found for this platform")]
    NoCompatibleAsset,

    /// Downloaded bytes did not match the published checksum.
    #[error("checksum verification failed: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Version string from the feed or the application could not be parsed.
    #[error("invalid version: {0}")]
    VersionParse(String),

    /// Filesystem error.
    #[error("IO error: {0}")]
    Io(String),
}

impl UpdateError {
    /// Short machine-readable kind, used in error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Packaging => "packaging",
            Self::Network(_) => "network",
            Self::Library(_) => "library",
            Self::Backend(detail) => detail.kind_static(),
            Self::InProgress => "in_progress",
            Self::NothingToInstall => "nothing_to_install",
            Self::NoCompatibleAsset => "no_compatible_asset",
            Self::ChecksumMismatch { .. } => "checksum_mismatch",
            Self::VersionParse(_) => "version_parse",
            Self::Io(_) => "io",
        }
    }

    /// Wraps any failure other than a packaging refusal as a network error.
    pub fn into_network(self) -> Self {
        match self {
            Self::Packaging | Self::Network(_) => self,
            other => Self::Network(other.to_string()),
        }
    }

    /// Returns the detail describing this error.
    pub fn detail(&self) -> ErrorDetail {
        match self {
            Self::Backend(detail) => detail.clone(),
            other => ErrorDetail {
                kind: other.kind().to_string(),
                detail: other.to_string(),
            },
        }
    }
}

impl From<std::io::Error> for UpdateError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// Serializable description of an error, carried in notifications and
/// UI payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Error kind (see [`UpdateError::kind`]).
    pub kind: String,
    /// Human readable description of the original error.
    pub detail: String,
}

impl ErrorDetail {
    /// Creates a detail of the given kind.
    pub fn new(kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            detail: detail.into(),
        }
    }

    fn kind_static(&self) -> &'static str {
        match self.kind.as_str() {
            "packaging" => "packaging",
            "network" => "network",
            "in_progress" => "in_progress",
            "nothing_to_install" => "nothing_to_install",
            "no_compatible_asset" => "no_compatible_asset",
            "checksum_mismatch" => "checksum_mismatch",
            "version_parse" => "version_parse",
            "io" => "io",
            _ => "library",
        }
    }
}

impl fmt::Display for ErrorDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail)
    }
}

impl From<&UpdateError> for ErrorDetail {
    fn from(e: &UpdateError) -> Self {
        e.detail()
    }
}

/// `{message, error}` pair reported to the UI instead of an unhandled fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Never empty.
    pub message: String,
    /// The original error.
    pub error: ErrorDetail,
}

impl ErrorPayload {
    /// Builds a payload, falling back to the error text (then to "unknown
    /// error") when `message` is blank.
    pub fn new(message: impl Into<String>, error: &UpdateError) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = error.to_string();
        }
        if message.trim().is_empty() {
            message = "unknown error".to_string();
        }
        Self {
            message,
            error: error.detail(),
        }
    }

    /// Payload whose message is the error's own description.
    pub fn from_error(error: &UpdateError) -> Self {
        Self::new(error.to_string(), error)
    }

    /// Payload for a failed update check.
    pub fn for_check(error: &UpdateError) -> Self {
        match error {
            UpdateError::Packaging => Self::new(PACKAGING_MESSAGE, error),
            _ => Self::new(CHECK_FAILED_MESSAGE, error),
        }
    }
}

/// Result type for update operations.
pub type Result<T> = std::result::Result<T, UpdateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn into_network_keeps_packaging() {
        assert!(matches!(
            UpdateError::Packaging.into_network(),
            UpdateError::Packaging
        ));
        let wrapped = UpdateError::Library("bad feed".into()).into_network();
        assert_eq!(wrapped.kind(), "network");
        assert!(wrapped.to_string().contains("bad feed"));
    }

    #[test]
    fn backend_error_keeps_original_detail() {
        let detail = ErrorDetail::new("checksum_mismatch", "expected a, got b");
        let err = UpdateError::Backend(detail.clone());
        assert_eq!(err.detail(), detail);
        assert_eq!(err.kind(), "checksum_mismatch");
        assert_eq!(err.to_string(), "expected a, got b");
    }

    #[test]
    fn payload_message_never_empty() {
        let err = UpdateError::Backend(ErrorDetail::new("library", ""));
        let payload = ErrorPayload::new("  ", &err);
        assert_eq!(payload.message, "unknown error");

        let err = UpdateError::Network("connection reset".into());
        let payload = ErrorPayload::new("", &err);
        assert_eq!(payload.message, "network error: connection reset");
    }

    #[test]
    fn check_payloads() {
        let payload = ErrorPayload::for_check(&UpdateError::Packaging);
        assert_eq!(payload.message, PACKAGING_MESSAGE);
        assert_eq!(payload.error.kind, "packaging");

        let payload = ErrorPayload::for_check(&UpdateError::Network("timeout".into()));
        assert_eq!(payload.message, CHECK_FAILED_MESSAGE);
        assert_eq!(payload.error.detail, "network error: timeout");
    }
}
