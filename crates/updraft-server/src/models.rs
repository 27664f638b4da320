//! API request and response models.

use serde::Serialize;

/// Response body for GET /api/version.
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    /// Application name.
    pub name: String,
    /// Running version.
    pub version: String,
    /// Whether update checks are active.
    pub packaged: bool,
}

/// Response body for requests whose work continues after the response.
#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    /// Always true.
    pub accepted: bool,
    /// The request that was accepted.
    pub action: &'static str,
}

impl AcceptedResponse {
    pub fn new(action: &'static str) -> Self {
        Self {
            accepted: true,
            action,
        }
    }
}
