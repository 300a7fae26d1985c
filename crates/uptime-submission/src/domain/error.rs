//! Error types for the submission backend.
//!
//! [`SubmitError`] is the terminal outcome of a rejected submission. Every
//! variant maps to exactly one HTTP status and a caller-safe message;
//! internal details are logged, never returned.

use super::types::SubmitterKey;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Generic message for failures not attributable to the caller.
pub const UNEXPECTED_SERVER_ERROR: &str = "Unexpected server error";

/// Rejection of a `/v1/submit` request.
#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    /// No Content-Length header
    #[error("Content-Length required")]
    LengthRequired,

    /// Content-Length header present but not a number
    #[error("Invalid Content-Length")]
    InvalidContentLength,

    /// Declared payload above the configured maximum
    #[error("Payload too large: {size} bytes (max: {max})")]
    PayloadTooLarge { size: u64, max: u64 },

    /// Body read failed, timed out, or length mismatch
    #[error("Error reading the body")]
    BodyRead,

    /// Body is not a valid submission document
    #[error("Error decoding payload")]
    Decode,

    /// A required field is absent or empty
    #[error("One of required fields wasn't provided")]
    MissingFields,

    /// Submitter not in the current whitelist
    #[error("Submitter is not registered: {0}")]
    NotRegistered(SubmitterKey),

    /// `created_at` beyond the allowed clock skew
    #[error("Field created_at is a timestamp in future")]
    FutureTimestamp,

    /// Signature check failed
    #[error("Invalid signature")]
    InvalidSignature,

    /// Attempt quota for the window used up
    #[error("Too many requests per hour")]
    RateLimited,

    /// Server-side failure; the detail is logged only
    #[error("internal error: {0}")]
    Internal(String),
}

impl SubmitError {
    pub fn status(&self) -> StatusCode {
        match self {
            SubmitError::LengthRequired => StatusCode::LENGTH_REQUIRED,
            SubmitError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            SubmitError::InvalidContentLength
            | SubmitError::BodyRead
            | SubmitError::Decode
            | SubmitError::MissingFields
            | SubmitError::FutureTimestamp => StatusCode::BAD_REQUEST,
            SubmitError::NotRegistered(_) | SubmitError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            SubmitError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            SubmitError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message returned to the caller.
    pub fn public_message(&self) -> String {
        match self {
            SubmitError::Internal(_) => UNEXPECTED_SERVER_ERROR.to_string(),
            other => other.to_string(),
        }
    }
}

/// JSON error body: `{"error": "<message>"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for SubmitError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Storage destination failures. Logged by the fan-out, never surfaced.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("destination unavailable: {0}")]
    Unavailable(String),
}

/// Whitelist fetch failures.
#[derive(Debug, thiserror::Error)]
pub enum WhitelistError {
    #[error("whitelist transport error: {0}")]
    Transport(String),

    #[error("whitelist parse error: {0}")]
    Parse(String),

    #[error("whitelist source not configured")]
    NotConfigured,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(SubmitError::LengthRequired.status(), StatusCode::LENGTH_REQUIRED);
        assert_eq!(
            SubmitError::PayloadTooLarge { size: 2, max: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(SubmitError::Decode.status(), StatusCode::BAD_REQUEST);
        assert_eq!(SubmitError::FutureTimestamp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SubmitError::NotRegistered(SubmitterKey::from_bytes([0; 32])).status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(SubmitError::InvalidSignature.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(SubmitError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            SubmitError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_detail_is_not_exposed() {
        let err = SubmitError::Internal("serde blew up at byte 12".into());
        assert_eq!(err.public_message(), UNEXPECTED_SERVER_ERROR);
        assert!(err.to_string().contains("byte 12"));
    }

    #[test]
    fn test_not_registered_names_submitter() {
        let key = SubmitterKey::from_bytes([0xaa; 32]);
        let msg = SubmitError::NotRegistered(key).public_message();
        assert!(msg.starts_with("Submitter is not registered: "));
        assert!(msg.ends_with(&key.to_string()));
    }
}
