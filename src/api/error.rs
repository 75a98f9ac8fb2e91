//! Error types for backend calls.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while talking to the chat backend.
///
/// Every variant is a network-level failure from the caller's point of view:
/// the request could not complete or its answer could not be understood.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    HttpClient(String),

    /// Backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response body did not match the expected shape.
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A staged file could not be read for upload.
    #[error("could not read {}: {source}", .path.display())]
    FileRead {
        /// Path of the staged file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failure reported by a non-HTTP backend implementation.
    #[error("{0}")]
    Other(String),
}

impl ApiError {
    /// Check if retrying the same request may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpRequest(err) => err.is_timeout() || err.is_connect() || err.is_request(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Other(_) => true,
            Self::HttpClient(_) | Self::InvalidUrl(_) | Self::JsonParse(_) | Self::FileRead { .. } => {
                false
            }
        }
    }

    /// HTTP status code if the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience result alias for backend calls.
pub type ApiResult<T> = Result<T, ApiError>;
