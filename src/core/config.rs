//! Configuration for the chat client.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::core::errors::{ClientError, ClientResult};
use crate::core::ids::UserId;

/// Default backend base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:8000/";

/// Environment variable overriding the backend base URL.
pub const API_URL_ENV: &str = "UNSTUCK_API_URL";
/// Environment variable overriding the local state file path.
pub const STATE_PATH_ENV: &str = "UNSTUCK_STATE_PATH";
/// Environment variable supplying an authenticated account id.
pub const USER_ID_ENV: &str = "UNSTUCK_USER_ID";

/// Name of the local state file inside the data directory.
const STATE_FILE_NAME: &str = "state.json";
/// Application directory name under the platform data directory.
const APP_DIR_NAME: &str = "unstuck";

/// Top-level configuration for the chat client.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Backend API settings.
    pub api: ApiConfig,
    /// Local storage settings.
    pub storage: StorageConfig,
    /// Authenticated account id, if the user signed in.
    pub account_id: Option<UserId>,
}

impl ClientConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_toml_file(path: &Path) -> ClientResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Parse a config from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML for this config.
    pub fn from_toml_str(raw: &str) -> ClientResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Apply overrides from the process environment.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(path) = lookup(STATE_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.storage.state_path = Some(PathBuf::from(path));
        }
        if let Some(user) = lookup(USER_ID_ENV).and_then(|v| v.parse().ok()) {
            self.account_id = Some(user);
        }
        self
    }

    /// Set the backend base URL.
    #[must_use]
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api.base_url = url.into();
        self
    }

    /// Set the local state file path.
    #[must_use]
    pub fn with_state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage.state_path = Some(path.into());
        self
    }

    /// Set the authenticated account id.
    #[must_use]
    pub fn with_account_id(mut self, user_id: UserId) -> Self {
        self.account_id = Some(user_id);
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> ClientResult<()> {
        let url = Url::parse(&self.api.base_url)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ClientError::InvalidConfig(format!(
                "api.base_url must be http or https, got {}",
                url.scheme()
            )));
        }

        if self.api.connect_timeout.is_zero() {
            return Err(ClientError::InvalidConfig(
                "api.connect_timeout must be > 0".to_string(),
            ));
        }

        if self.api.request_timeout.is_some_and(|t| t.is_zero()) {
            return Err(ClientError::InvalidConfig(
                "api.request_timeout must be > 0 when set".to_string(),
            ));
        }

        Ok(())
    }
}

/// Backend API settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL every endpoint is resolved against.
    pub base_url: String,
    /// Connection timeout.
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,
    /// Whole-request timeout; unset leaves completion to the transport.
    #[serde(with = "optional_duration_serde")]
    pub request_timeout: Option<Duration>,
    /// User agent sent with every request.
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: None,
            user_agent: format!("unstuck-chat/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiConfig {
    /// Parse the base URL, ensuring it ends with `/` so endpoints join under it.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid.
    pub fn base(&self) -> ClientResult<Url> {
        let mut raw = self.base_url.trim().to_string();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Ok(Url::parse(&raw)?)
    }
}

/// Local storage settings.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path of the JSON state file holding the guest id.
    pub state_path: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolve the state file path, falling back to the platform data directory.
    ///
    /// # Errors
    /// Returns an error if no path is configured and no data directory exists.
    pub fn resolve_state_path(&self) -> ClientResult<PathBuf> {
        if let Some(path) = &self.state_path {
            return Ok(path.clone());
        }
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME).join(STATE_FILE_NAME))
            .ok_or_else(|| {
                ClientError::InvalidConfig(
                    "no data directory available; set storage.state_path".to_string(),
                )
            })
    }
}

/// Serde module for Duration serialization as whole seconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Serde module for optional Duration serialization as whole seconds.
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.map(|d| d.as_secs()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
