//! Error types for the RAG pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Document could not be read or parsed into pages
    #[error("Failed to load document '{source_path}': {message}")]
    Load {
        source_path: String,
        message: String,
    },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Embedding model unavailable or inference failed
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Query vector does not match the indexed dimensionality
    #[error("Dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Caller supplied an out-of-range argument
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Completion backend failed; `partial` holds the text produced before the failure
    #[error("Generation failed: {message}")]
    Generation { message: String, partial: String },

    /// Completion backend did not answer within the configured bound
    #[error("Timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a load error for the given source
    pub fn load(source_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Load {
            source_path: source_path.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a generation error carrying the partial response
    pub fn generation(message: impl Into<String>, partial: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
            partial: partial.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Re-tag any error as a generation failure with the given partial buffer.
    ///
    /// Errors that already are `Generation` keep their message but take the new partial.
    pub fn into_generation(self, partial: &str) -> Self {
        match self {
            Error::Generation { message, .. } => Error::generation(message, partial),
            other => Error::generation(other.to_string(), partial),
        }
    }

    /// Text produced before a generation failure, if any
    pub fn partial_response(&self) -> Option<&str> {
        match self {
            Error::Generation { partial, .. } => Some(partial.as_str()),
            _ => None,
        }
    }

    /// Startup-phase errors abort initialization; everything else is scoped to one request
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Config(_)
                | Error::Load { .. }
                | Error::UnsupportedFileType(_)
                | Error::Embedding(_)
                | Error::DimensionMismatch { .. }
        )
    }

    fn kind(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::Load { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "load_error"),
            Error::UnsupportedFileType(_) => (StatusCode::BAD_REQUEST, "unsupported_type"),
            Error::Embedding(_) => (StatusCode::INTERNAL_SERVER_ERROR, "embedding_error"),
            Error::DimensionMismatch { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "dimension_mismatch")
            }
            Error::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request"),
            Error::Generation { .. } => (StatusCode::BAD_GATEWAY, "generation_error"),
            Error::Timeout(_) => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Http(_) => (StatusCode::BAD_GATEWAY, "http_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.kind();

        let mut error = json!({
            "type": error_type,
            "message": self.to_string(),
        });
        if let Some(partial) = self.partial_response() {
            error["partial"] = json!(partial);
        }

        (status, Json(json!({ "error": error }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_generation_keeps_partial() {
        let err = Error::Timeout(std::time::Duration::from_secs(5)).into_generation("AB");
        assert_eq!(err.partial_response(), Some("AB"));
        assert!(err.to_string().contains("Timed out"));
    }

    #[test]
    fn test_fatal_classification() {
        assert!(Error::load("doc.pdf", "corrupt").is_fatal());
        assert!(Error::embedding("no model").is_fatal());
        assert!(!Error::generation("backend closed", "").is_fatal());
    }
}
