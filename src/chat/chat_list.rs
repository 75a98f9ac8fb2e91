//! Cache of the user's chat summaries, shared across screens.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::backend::ChatBackend;
use crate::api::types::ChatSummary;
use crate::chat::version::ChatListVersion;
use crate::core::errors::ClientResult;
use crate::session::identity::SessionIdentity;

#[derive(Debug)]
struct HeldChats {
    identity: SessionIdentity,
    version: u64,
    chats: Vec<ChatSummary>,
}

/// Chat summaries of one identity, valid for one chat-list version.
pub struct ChatListCache {
    backend: Arc<dyn ChatBackend>,
    version: ChatListVersion,
    held: Mutex<Option<HeldChats>>,
}

impl ChatListCache {
    /// Create an empty cache invalidated by `version`.
    #[must_use]
    pub fn new(backend: Arc<dyn ChatBackend>, version: ChatListVersion) -> Self {
        Self {
            backend,
            version,
            held: Mutex::new(None),
        }
    }

    /// Fetch the chats of `identity` and replace the held list.
    ///
    /// A guest without an id has no chats; the backend is not asked.
    ///
    /// # Errors
    /// Returns a network error if the list cannot be fetched; the held list is
    /// left as it was.
    pub async fn refresh(&self, identity: &SessionIdentity) -> ClientResult<Vec<ChatSummary>> {
        let version = self.version.current();
        let chats = match identity.user_id() {
            Some(user_id) => self.backend.list_chats(user_id.clone()).await?,
            None => {
                debug!("no user id yet, chat list is empty");
                Vec::new()
            }
        };
        info!(%identity, chats = chats.len(), version, "chat list refreshed");
        *self.held.lock() = Some(HeldChats {
            identity: identity.clone(),
            version,
            chats: chats.clone(),
        });
        Ok(chats)
    }

    /// Held list if it belongs to `identity` and the current version.
    #[must_use]
    pub fn cached(&self, identity: &SessionIdentity) -> Option<Vec<ChatSummary>> {
        let held = self.held.lock();
        held.as_ref()
            .filter(|held| held.identity == *identity && held.version == self.version.current())
            .map(|held| held.chats.clone())
    }

    /// Whether the held list is still valid for `identity`.
    #[must_use]
    pub fn is_current(&self, identity: &SessionIdentity) -> bool {
        self.cached(identity).is_some()
    }

    /// Chats of `identity`, refreshing only when the held list is stale.
    ///
    /// # Errors
    /// Returns a network error if a refresh was needed and failed.
    pub async fn chats(&self, identity: &SessionIdentity) -> ClientResult<Vec<ChatSummary>> {
        if let Some(chats) = self.cached(identity) {
            debug!(chats = chats.len(), "chat list served from cache");
            return Ok(chats);
        }
        self.refresh(identity).await
    }

    /// Drop the held list.
    pub fn invalidate(&self) {
        *self.held.lock() = None;
    }

    /// Signal that chats changed; every holder of the version refetches.
    pub fn bump(&self) -> u64 {
        self.version.bump()
    }

    /// Receiver notified whenever the chat list changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }
}
