//! Local persistence of the guest user id.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::errors::ClientResult;
use crate::core::ids::UserId;

/// Storage for the single persisted client value: the guest user id.
pub trait GuestIdStore: Send + Sync {
    /// Read the stored guest id.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be read.
    fn load(&self) -> ClientResult<Option<UserId>>;

    /// Store `user_id`, replacing any previous value.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be written.
    fn save(&self, user_id: &UserId) -> ClientResult<()>;

    /// Remove the stored guest id.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be written.
    fn clear(&self) -> ClientResult<()>;
}

/// On-disk layout of the state file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    guest_user_id: Option<UserId>,
}

/// Guest id kept in a small JSON file.
///
/// Writes land in a sibling temp file that is renamed over the target, so a
/// reader never sees a half-written file. A file that still fails to parse
/// is treated as holding no guest id.
#[derive(Debug, Clone)]
pub struct FileGuestIdStore {
    path: PathBuf,
}

impl FileGuestIdStore {
    /// Use the state file at `path`; it is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_state(&self) -> ClientResult<StateFile> {
        match fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(StateFile::default()),
            Ok(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|err| {
                warn!(
                    path = %self.path.display(),
                    error = %err,
                    "state file unreadable, ignoring it"
                );
                StateFile::default()
            })),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StateFile::default()),
            Err(err) => Err(err.into()),
        }
    }

    fn write_state(&self, state: &StateFile) -> ClientResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(state)?;
        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|err| err.error)?;
        Ok(())
    }
}

impl GuestIdStore for FileGuestIdStore {
    fn load(&self) -> ClientResult<Option<UserId>> {
        Ok(self.read_state()?.guest_user_id)
    }

    fn save(&self, user_id: &UserId) -> ClientResult<()> {
        let mut state = self.read_state()?;
        state.guest_user_id = Some(user_id.clone());
        self.write_state(&state)?;
        debug!(path = %self.path.display(), "guest id saved");
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut state = self.read_state()?;
        state.guest_user_id = None;
        self.write_state(&state)
    }
}

/// Guest id kept only for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryGuestIdStore {
    value: Mutex<Option<UserId>>,
}

impl MemoryGuestIdStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `user_id`.
    #[must_use]
    pub fn with_guest(user_id: UserId) -> Self {
        Self {
            value: Mutex::new(Some(user_id)),
        }
    }
}

impl GuestIdStore for MemoryGuestIdStore {
    fn load(&self) -> ClientResult<Option<UserId>> {
        Ok(self.value.lock().clone())
    }

    fn save(&self, user_id: &UserId) -> ClientResult<()> {
        *self.value.lock() = Some(user_id.clone());
        Ok(())
    }

    fn clear(&self) -> ClientResult<()> {
        *self.value.lock() = None;
        Ok(())
    }
}
