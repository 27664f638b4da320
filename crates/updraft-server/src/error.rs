//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use updraft_core::{ErrorPayload, UpdateError};

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The update check failed.
    #[error("update check failed: {0}")]
    Check(UpdateError),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Check(UpdateError::Packaging) => StatusCode::PRECONDITION_FAILED,
            ApiError::Check(UpdateError::InProgress) => StatusCode::CONFLICT,
            ApiError::Check(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            ApiError::Check(e) => ErrorPayload::for_check(e),
        };

        (status, axum::Json(body)).into_response()
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(
            ApiError::Check(UpdateError::Packaging).status(),
            StatusCode::PRECONDITION_FAILED
        );
        assert_eq!(
            ApiError::Check(UpdateError::Network("timeout".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
