//! # Error Handling and Response Types
//!
//! Every fallible operation of the registry returns [`RegistryResult`]. The
//! error enum doubles as an HTTP response so a transport layer can hand it
//! back to `cargo` unchanged:
//!
//! ```json
//! {
//!   "error": "Human-readable error message",
//!   "code": "machine_readable_error_code",
//!   "details": null,
//!   "timestamp": "2024-01-01T12:00:00Z"
//! }
//! ```
//!
//! Internal failures (git, I/O, storage) never leak their message into the
//! response body; they are logged instead.

use crate::git::GitError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};

const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Standardized error response structure for consistent API error handling
#[derive(Serialize, Debug)]
pub struct ApiErrorResponse {
    pub error: String,          // Human-readable error message
    pub code: String,           // Machine-readable error code
    pub details: Option<Value>, // Additional error details
    pub timestamp: String,      // ISO 8601 timestamp
}

/// Error code classification for machine-readable error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    UploadError,
    Conflict,
    QuotaExceeded,
    NotFound,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationError => "validation_error",
            ErrorCode::UploadError => "upload_error",
            ErrorCode::Conflict => "conflict",
            ErrorCode::QuotaExceeded => "quota_exceeded",
            ErrorCode::NotFound => "not_found",
            ErrorCode::InternalError => "internal_error",
        }
    }

    pub fn http_status(&self) -> StatusCode {
        match self {
            ErrorCode::ValidationError => StatusCode::BAD_REQUEST,
            ErrorCode::UploadError => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorCode::Conflict => StatusCode::CONFLICT,
            ErrorCode::QuotaExceeded => StatusCode::FORBIDDEN,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Registry error types with error codes
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid crate name: {0}")]
    InvalidName(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    UploadError(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Git error: {0}")]
    Git(#[from] GitError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RegistryError {
    /// Get the appropriate error code for this error type
    pub fn error_code(&self) -> ErrorCode {
        match self {
            RegistryError::InvalidName(_)
            | RegistryError::InvalidVersion(_)
            | RegistryError::BadRequest(_)
            | RegistryError::Git(GitError::InvalidPath(_)) => ErrorCode::ValidationError,
            RegistryError::UploadError(_) => ErrorCode::UploadError,
            RegistryError::Conflict(_) => ErrorCode::Conflict,
            RegistryError::QuotaExceeded(_) => ErrorCode::QuotaExceeded,
            RegistryError::NotFound(_) => ErrorCode::NotFound,
            RegistryError::Internal(_)
            | RegistryError::Git(_)
            | RegistryError::Io(_)
            | RegistryError::Json(_) => ErrorCode::InternalError,
        }
    }

    /// Get additional error details if available
    pub fn details(&self) -> Option<Value> {
        match self {
            RegistryError::InvalidName(name) => Some(json!({ "field": "name", "value": name })),
            RegistryError::InvalidVersion(version) => {
                Some(json!({ "field": "vers", "value": version }))
            }
            _ => None,
        }
    }

    /// Create a standardized error response
    pub fn to_error_response(&self) -> ApiErrorResponse {
        let code = self.error_code();
        let (error, details) = if code == ErrorCode::InternalError {
            (INTERNAL_ERROR_MESSAGE.to_string(), None)
        } else {
            (self.to_string(), self.details())
        };

        ApiErrorResponse {
            error,
            code: code.as_str().to_string(),
            details,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        if code == ErrorCode::InternalError {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::warn!(error = %self, "Request rejected");
        }

        let error_response = self.to_error_response();
        let status = code.http_status();

        tracing::debug!(status = %status, code = %error_response.code, "Returning standardized error response");

        (status, axum::Json(error_response)).into_response()
    }
}

/// Convenient result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RegistryError::InvalidName("1x".into()), StatusCode::BAD_REQUEST),
            (RegistryError::InvalidVersion("1".into()), StatusCode::BAD_REQUEST),
            (RegistryError::BadRequest("bad".into()), StatusCode::BAD_REQUEST),
            (RegistryError::UploadError("short".into()), StatusCode::PAYLOAD_TOO_LARGE),
            (RegistryError::Conflict("dup".into()), StatusCode::CONFLICT),
            (RegistryError::QuotaExceeded("full".into()), StatusCode::FORBIDDEN),
            (RegistryError::NotFound("gone".into()), StatusCode::NOT_FOUND),
            (RegistryError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                RegistryError::Git(GitError::BranchNotFound("main".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                RegistryError::Git(GitError::InvalidPath("..".into())),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(error.error_code().http_status(), status, "{error}");
        }
    }

    #[test]
    fn test_internal_errors_hide_details() {
        let error = RegistryError::Internal("disk at /srv/secret is full".into());
        let response = error.to_error_response();

        assert_eq!(response.error, INTERNAL_ERROR_MESSAGE);
        assert_eq!(response.code, "internal_error");
        assert!(response.details.is_none());
    }

    #[test]
    fn test_validation_errors_keep_message() {
        let error = RegistryError::InvalidName("0day".into());
        let response = error.to_error_response();

        assert_eq!(response.error, "Invalid crate name: 0day");
        assert_eq!(response.code, "validation_error");
        assert_eq!(response.details, Some(json!({ "field": "name", "value": "0day" })));
    }

    #[test]
    fn test_into_response_status() {
        let response = RegistryError::Conflict("exists".into()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
