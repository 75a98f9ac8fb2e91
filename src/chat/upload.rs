//! Upload coordinator: creates (or reuses) a chat and submits staged files.
//!
//! `Idle -> Starting -> Uploading -> Succeeded | Failed`. `Succeeded` and
//! `Failed` are resting phases: they keep the last outcome for display but
//! count as idle, so a new upload is admitted from them.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::api::backend::ChatBackend;
use crate::api::types::UploadRequest;
use crate::chat::staging::StagingBuffer;
use crate::chat::version::ChatListVersion;
use crate::core::errors::{ClientError, ClientResult};
use crate::core::ids::{ChatId, UserId};
use crate::session::identity::{IdentityProvider, SessionIdentity};

/// Progress of the current (or last) upload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UploadPhase {
    /// Nothing has been uploaded yet, or the last attempt was abandoned.
    Idle,
    /// Requesting a chat id from the backend.
    Starting,
    /// Sending the files.
    Uploading,
    /// Last upload landed in this chat.
    Succeeded(ChatId),
    /// Last upload failed with this message; the files are still staged.
    /// Idle-equivalent: a retry is admitted.
    Failed(String),
}

impl UploadPhase {
    /// Whether an upload is running.
    #[must_use]
    pub const fn is_busy(&self) -> bool {
        matches!(self, Self::Starting | Self::Uploading)
    }

    /// Whether a new upload may start: `Idle` or a finished outcome.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        !self.is_busy()
    }
}

/// Chat an upload goes to.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum UploadTarget {
    /// Create a new chat.
    NewChat,
    /// Add documents to an existing chat.
    Existing(ChatId),
}

/// Where to navigate after a successful upload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadReceipt {
    /// Chat the files were added to.
    pub chat_id: ChatId,
    /// Identity the chat belongs to.
    pub identity: SessionIdentity,
    /// Confirmation text returned by the backend.
    pub message: String,
}

/// Sequences chat creation and file submission.
pub struct UploadCoordinator {
    backend: Arc<dyn ChatBackend>,
    identity: Arc<IdentityProvider>,
    version: ChatListVersion,
    phase: Mutex<UploadPhase>,
}

/// Puts the phase back to `Idle` if an upload future is dropped midway.
struct PhaseGuard<'a> {
    phase: &'a Mutex<UploadPhase>,
    armed: bool,
}

impl PhaseGuard<'_> {
    fn set(&self, next: UploadPhase) {
        *self.phase.lock() = next;
    }

    fn finish(mut self, next: UploadPhase) {
        self.armed = false;
        self.set(next);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!("upload abandoned");
            *self.phase.lock() = UploadPhase::Idle;
        }
    }
}

impl UploadCoordinator {
    /// Create a coordinator bumping `version` after each successful upload.
    #[must_use]
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        identity: Arc<IdentityProvider>,
        version: ChatListVersion,
    ) -> Self {
        Self {
            backend,
            identity,
            version,
            phase: Mutex::new(UploadPhase::Idle),
        }
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> UploadPhase {
        self.phase.lock().clone()
    }

    /// Forget the outcome of the last upload. Ignored while one is running.
    pub fn reset(&self) {
        let mut phase = self.phase.lock();
        if phase.is_idle() {
            *phase = UploadPhase::Idle;
        }
    }

    /// Upload every staged file to `target`.
    ///
    /// On success the buffer is emptied and the chat-list version bumped. On
    /// failure the buffer is left as it was; nothing is retried.
    ///
    /// # Errors
    /// - `NoFilesSelected` if the buffer is empty
    /// - `AlreadyInProgress` if another upload is running
    /// - a network error if the backend rejects either step
    pub async fn upload(
        &self,
        staging: &mut StagingBuffer,
        target: UploadTarget,
    ) -> ClientResult<UploadReceipt> {
        if staging.is_empty() {
            return Err(ClientError::NoFilesSelected);
        }
        {
            let mut phase = self.phase.lock();
            if !phase.is_idle() {
                return Err(ClientError::AlreadyInProgress);
            }
            *phase = UploadPhase::Starting;
        }
        let guard = PhaseGuard {
            phase: &self.phase,
            armed: true,
        };

        match self.run(&guard, staging, target).await {
            Ok(receipt) => {
                staging.clear();
                let version = self.version.bump();
                info!(chat_id = %receipt.chat_id, version, "upload succeeded");
                guard.finish(UploadPhase::Succeeded(receipt.chat_id.clone()));
                Ok(receipt)
            }
            Err(err) => {
                warn!(error = %err, files = staging.len(), "upload failed");
                guard.finish(UploadPhase::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        guard: &PhaseGuard<'_>,
        staging: &StagingBuffer,
        target: UploadTarget,
    ) -> ClientResult<UploadReceipt> {
        let identity = self.identity.resolve_identity();
        let (chat_id, user_id, identity) = match (target, identity.user_id().cloned()) {
            (UploadTarget::Existing(chat_id), Some(user_id)) => {
                debug!(%chat_id, "uploading into existing chat");
                (chat_id, user_id, identity)
            }
            (target, _) => {
                if let UploadTarget::Existing(chat_id) = target {
                    warn!(%chat_id, "no user id for existing chat, starting a new one");
                }
                self.start_chat(identity).await?
            }
        };

        guard.set(UploadPhase::Uploading);
        info!(%chat_id, files = staging.len(), "uploading files");
        let message = self
            .backend
            .upload(UploadRequest {
                user_id,
                chat_id: chat_id.clone(),
                files: staging.files().to_vec(),
            })
            .await?;

        Ok(UploadReceipt {
            chat_id,
            identity,
            message,
        })
    }

    async fn start_chat(
        &self,
        identity: SessionIdentity,
    ) -> ClientResult<(ChatId, UserId, SessionIdentity)> {
        let started = self.backend.start_chat(identity.user_id().cloned()).await?;
        debug!(chat_id = %started.chat_id, "chat started");

        if identity.is_authenticated() {
            return Ok((started.chat_id, started.user_id, identity));
        }
        if let Err(err) = self.identity.remember_guest(&started.user_id) {
            warn!(error = %err, "could not persist guest id");
        }
        let identity = SessionIdentity::Guest(Some(started.user_id.clone()));
        Ok((started.chat_id, started.user_id, identity))
    }
}
