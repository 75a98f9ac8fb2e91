//! Core client types: configuration, errors and identifiers.

pub mod config;
pub mod errors;
pub mod ids;

pub use config::{ApiConfig, ClientConfig, StorageConfig};
pub use errors::{ClientError, ClientResult, ErrorKind};
pub use ids::{ChatId, EmptyIdError, UserId};
