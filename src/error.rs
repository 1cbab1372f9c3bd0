//! Error types for the document Q&A service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A referenced entity (document, conversation, message) is absent or inactive
    #[error("Not found: {0}")]
    NotFound(String),

    /// The request is missing or mis-stating a required parameter
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Embedding, chat-completion, or vector-index call failed
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Repository I/O failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Text extraction failed
    #[error("Failed to extract text from '{filename}': {message}")]
    Extract { filename: String, message: String },

    /// Unsupported MIME type on upload
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Generic wrapper for the upload pipeline boundary
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    /// Generic wrapper for the query pipeline boundary
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a not-found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a bad-request error
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// Create an upstream error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create an extraction error
    pub fn extract(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extract {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// True for the typed kinds that must cross pipeline boundaries unchanged
    pub fn is_typed(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::BadRequest(_))
    }

    /// Wrap an error at the query-pipeline boundary.
    ///
    /// Typed `NotFound`/`BadRequest` pass through unchanged; everything else
    /// becomes `QueryFailed` carrying only a summary of the cause.
    pub fn into_query_failed(self) -> Self {
        if self.is_typed() {
            self
        } else {
            tracing::error!("query pipeline failure: {}", self);
            Self::QueryFailed(self.to_string())
        }
    }

    /// Wrap an error at the upload-pipeline boundary, same pass-through rule.
    pub fn into_upload_failed(self) -> Self {
        if self.is_typed() {
            self
        } else {
            tracing::error!("upload pipeline failure: {}", self);
            Self::UploadFailed(self.to_string())
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::BAD_REQUEST, "config_error", msg.clone()),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            Error::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg.clone()),
            Error::Storage(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", msg.clone())
            }
            Error::Extract { filename, message } => (
                StatusCode::BAD_REQUEST,
                "extract_error",
                format!("Failed to extract '{}': {}", filename, message),
            ),
            Error::UnsupportedFileType(mime) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported file type: {}", mime),
            ),
            Error::UploadFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "upload_failed", msg.clone())
            }
            Error::QueryFailed(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "query_failed", msg.clone())
            }
            Error::Io(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                err.to_string(),
            ),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_errors_pass_through_boundary() {
        let err = Error::not_found("conversation abc").into_query_failed();
        assert!(matches!(err, Error::NotFound(_)));

        let err = Error::bad_request("missing id").into_upload_failed();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn other_errors_are_wrapped() {
        let err = Error::upstream("embedding timeout").into_query_failed();
        assert!(matches!(err, Error::QueryFailed(_)));

        let err = Error::storage("disk full").into_upload_failed();
        assert!(matches!(err, Error::UploadFailed(_)));
    }
}
