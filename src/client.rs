//! Process-wide chat client wiring.

use std::sync::Arc;

use tracing::info;

use crate::api::backend::ChatBackend;
use crate::api::http::HttpBackend;
use crate::api::types::ChatSummary;
use crate::chat::chat_list::ChatListCache;
use crate::chat::staging::StagingBuffer;
use crate::chat::transcript::ChatTranscript;
use crate::chat::upload::{UploadCoordinator, UploadReceipt, UploadTarget};
use crate::chat::version::ChatListVersion;
use crate::core::config::ClientConfig;
use crate::core::errors::ClientResult;
use crate::core::ids::ChatId;
use crate::session::guest_store::{FileGuestIdStore, GuestIdStore};
use crate::session::identity::{IdentityProvider, SessionIdentity};

/// Owns the shared state (identity, chat-list version) and the components
/// built on it.
pub struct ChatClient {
    config: ClientConfig,
    backend: Arc<dyn ChatBackend>,
    identity: Arc<IdentityProvider>,
    version: ChatListVersion,
    chat_list: ChatListCache,
    uploads: UploadCoordinator,
}

impl ChatClient {
    /// Build a client talking HTTP to the configured backend, with the guest
    /// id kept in the configured state file.
    ///
    /// # Errors
    /// Returns an error if the config is invalid, the HTTP client cannot be
    /// built, or the state file cannot be read.
    pub fn from_config(config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let backend: Arc<dyn ChatBackend> = Arc::new(HttpBackend::new(&config.api)?);
        let state_path = config.storage.resolve_state_path()?;
        info!(api = %config.api.base_url, state = %state_path.display(), "chat client configured");
        let store: Arc<dyn GuestIdStore> = Arc::new(FileGuestIdStore::new(state_path));
        Self::with_parts(config, backend, store)
    }

    /// Build a client from explicit parts.
    ///
    /// Signs in with `config.account_id` when set.
    ///
    /// # Errors
    /// Returns an error if the guest id store cannot be read or cleared.
    pub fn with_parts(
        config: ClientConfig,
        backend: Arc<dyn ChatBackend>,
        store: Arc<dyn GuestIdStore>,
    ) -> ClientResult<Self> {
        let identity = Arc::new(IdentityProvider::new(store)?);
        if let Some(account) = config.account_id.clone() {
            identity.login(account)?;
        }
        let version = ChatListVersion::new();
        let chat_list = ChatListCache::new(Arc::clone(&backend), version.clone());
        let uploads =
            UploadCoordinator::new(Arc::clone(&backend), Arc::clone(&identity), version.clone());
        Ok(Self {
            config,
            backend,
            identity,
            version,
            chat_list,
            uploads,
        })
    }

    /// Settings the client was built from.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Identity calls are currently scoped to.
    #[must_use]
    pub fn identity(&self) -> SessionIdentity {
        self.identity.resolve_identity()
    }

    /// Identity provider shared by every component.
    #[must_use]
    pub fn identity_provider(&self) -> &IdentityProvider {
        &self.identity
    }

    /// Shared chat-list version counter.
    #[must_use]
    pub const fn version(&self) -> &ChatListVersion {
        &self.version
    }

    /// Chat list cache.
    #[must_use]
    pub const fn chat_list(&self) -> &ChatListCache {
        &self.chat_list
    }

    /// Upload coordinator.
    #[must_use]
    pub const fn uploads(&self) -> &UploadCoordinator {
        &self.uploads
    }

    /// Upload the staged files; see [`UploadCoordinator::upload`].
    ///
    /// # Errors
    /// Propagates the coordinator's validation, concurrency and network errors.
    pub async fn upload(
        &self,
        staging: &mut StagingBuffer,
        target: UploadTarget,
    ) -> ClientResult<UploadReceipt> {
        self.uploads.upload(staging, target).await
    }

    /// Chats of the current identity, from cache when still valid.
    ///
    /// # Errors
    /// Returns a network error if a refresh was needed and failed.
    pub async fn chats(&self) -> ClientResult<Vec<ChatSummary>> {
        self.chat_list.chats(&self.identity()).await
    }

    /// Open an empty transcript for `chat_id` under the current identity.
    #[must_use]
    pub fn open_chat(&self, chat_id: ChatId) -> ChatTranscript {
        ChatTranscript::new(chat_id, self.identity(), Arc::clone(&self.backend))
    }

    /// Leave the account and drop the persisted guest id.
    ///
    /// # Errors
    /// Returns an error if the stored guest id cannot be cleared.
    pub fn sign_out(&self) -> ClientResult<()> {
        self.identity.logout();
        self.identity.forget_guest()?;
        self.chat_list.invalidate();
        info!("local identity cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::api::fake::{Call, FakeBackend};
    use crate::api::types::{QueryAnswer, QueryRequest};
    use crate::chat::staging::StagedFile;
    use crate::chat::transcript::QueryOutcome;
    use crate::core::ids::UserId;
    use crate::session::guest_store::MemoryGuestIdStore;

    fn client_with(backend: &Arc<FakeBackend>, config: ClientConfig) -> ChatClient {
        let api: Arc<dyn ChatBackend> = backend.clone();
        let store: Arc<dyn GuestIdStore> = Arc::new(MemoryGuestIdStore::new());
        ChatClient::with_parts(config, api, store).unwrap()
    }

    #[tokio::test]
    async fn test_upload_then_query_uses_new_guest() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_started("c1", "g1");
        backend.push_upload(Ok("uploaded".to_string()));
        backend.push_answer(Ok(QueryAnswer {
            text: "answer".to_string(),
            sources: Vec::new(),
        }));
        let client = client_with(&backend, ClientConfig::new());
        let mut staging = StagingBuffer::new();
        staging.add([StagedFile::new("notes.pdf")]);

        let receipt = client
            .upload(&mut staging, UploadTarget::NewChat)
            .await
            .unwrap();
        assert_eq!(client.version().current(), 1);
        assert_eq!(client.identity(), receipt.identity);

        let transcript = client.open_chat(receipt.chat_id);
        let outcome = transcript.submit_query("what?").await.unwrap();
        assert_eq!(outcome, QueryOutcome::Answered { index: 1 });
        assert_eq!(
            backend.calls().last(),
            Some(&Call::Query(QueryRequest {
                query: "what?".to_string(),
                user_id: Some(UserId::new("g1")),
                chat_id: ChatId::new("c1"),
            }))
        );
    }

    #[tokio::test]
    async fn test_configured_account_signs_in() {
        let backend = Arc::new(FakeBackend::new());
        backend.push_chats(Ok(vec![ChatSummary {
            chat_id: ChatId::new("c1"),
            document_names: vec!["a.pdf".to_string()],
            created_at: Utc::now(),
        }]));
        let config = ClientConfig::new().with_account_id(UserId::new("acct"));
        let client = client_with(&backend, config);

        assert!(client.identity().is_authenticated());
        assert_eq!(client.chats().await.unwrap().len(), 1);
        assert!(client.chat_list().is_current(&client.identity()));
        assert_eq!(client.config().account_id, Some(UserId::new("acct")));

        client.sign_out().unwrap();
        assert_eq!(client.identity(), SessionIdentity::Guest(None));
        assert!(!client.chat_list().is_current(&client.identity()));
        assert!(!client.uploads().phase().is_busy());
    }

    #[test]
    fn test_from_config_uses_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"guest_user_id":"g9"}"#).unwrap();
        let config = ClientConfig::new().with_state_path(&path);

        let client = ChatClient::from_config(config).unwrap();

        assert_eq!(
            client.identity(),
            SessionIdentity::Guest(Some(UserId::new("g9")))
        );
    }

    #[test]
    fn test_from_config_survives_truncated_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, r#"{"guest_user_id":"g1""#).unwrap();
        let config = ClientConfig::new().with_state_path(&path);

        let client = ChatClient::from_config(config).unwrap();

        assert_eq!(client.identity(), SessionIdentity::Guest(None));
        client.sign_out().unwrap();
    }

    #[test]
    fn test_from_config_rejects_bad_url() {
        let config = ClientConfig::new().with_api_url("ftp://example.com/");
        assert!(ChatClient::from_config(config).is_err());
    }
}
