//! Error types for the chat client components.

use thiserror::Error;

use crate::api::ApiError;

/// Coarse classification of client errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A backend request could not complete.
    NetworkFailure,
    /// Input was rejected before any network effect.
    ValidationFailure,
    /// Another operation of the same kind is still running.
    ConcurrencyConflict,
    /// A staging index did not refer to a staged file.
    IndexOutOfRange,
    /// Configuration could not be loaded or is invalid.
    Configuration,
    /// Local persisted state could not be read or written.
    Storage,
}

/// Chat client error type.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Query text is empty or whitespace-only.
    #[error("query text is empty")]
    EmptyQuery,
    /// Upload requested with no staged files.
    #[error("no files selected")]
    NoFilesSelected,
    /// An upload is already starting or uploading.
    #[error("an upload is already in progress")]
    AlreadyInProgress,
    /// A query is already awaiting its answer.
    #[error("a query is already awaiting an answer")]
    QueryInFlight,
    /// Staging index outside the buffer.
    #[error("index {index} out of range for {len} staged files")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of staged files.
        len: usize,
    },
    /// Backend call failed.
    #[error(transparent)]
    Network(#[from] ApiError),
    /// Invalid configuration or unsupported values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Configuration file could not be parsed.
    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
    /// URL parse error in configuration.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
    /// Local state file could not be read or written.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Local state file is not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyQuery | Self::NoFilesSelected => ErrorKind::ValidationFailure,
            Self::AlreadyInProgress | Self::QueryInFlight => ErrorKind::ConcurrencyConflict,
            Self::IndexOutOfRange { .. } => ErrorKind::IndexOutOfRange,
            Self::Network(_) => ErrorKind::NetworkFailure,
            Self::InvalidConfig(_) | Self::ConfigParse(_) | Self::Url(_) => {
                ErrorKind::Configuration
            }
            Self::Io(_) | Self::Serialization(_) => ErrorKind::Storage,
        }
    }

    /// Check if the same call may succeed if issued again unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(err) => err.is_retryable(),
            Self::AlreadyInProgress | Self::QueryInFlight => true,
            _ => false,
        }
    }
}

/// Convenience result alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(ClientError::EmptyQuery.kind(), ErrorKind::ValidationFailure);
        assert_eq!(ClientError::NoFilesSelected.kind(), ErrorKind::ValidationFailure);
        assert_eq!(ClientError::QueryInFlight.kind(), ErrorKind::ConcurrencyConflict);
        assert_eq!(ClientError::AlreadyInProgress.kind(), ErrorKind::ConcurrencyConflict);
        assert_eq!(
            ClientError::IndexOutOfRange { index: 3, len: 1 }.kind(),
            ErrorKind::IndexOutOfRange
        );
        assert_eq!(
            ClientError::from(ApiError::Other("down".to_string())).kind(),
            ErrorKind::NetworkFailure
        );
    }

    #[test]
    fn test_network_error_is_transparent() {
        let err = ClientError::from(ApiError::Status {
            status: 500,
            body: "boom".to_string(),
        });
        assert_eq!(err.to_string(), "backend returned status 500: boom");
        assert!(err.is_retryable());
        assert!(!ClientError::EmptyQuery.is_retryable());
    }
}
