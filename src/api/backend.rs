//! Backend abstraction consumed by the chat components.

use std::future::Future;
use std::pin::Pin;

use crate::api::error::ApiResult;
use crate::api::types::{
    ChatSummary, HistoryEntry, QueryAnswer, QueryRequest, StartedChat, UploadRequest,
};
use crate::core::ids::{ChatId, UserId};

/// Boxed future type for backend operations.
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Retrieval/answer service the client talks to.
pub trait ChatBackend: Send + Sync {
    /// Create a chat, allocating a guest user id when `user_id` is `None`.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    fn start_chat(&self, user_id: Option<UserId>) -> ApiFuture<'_, ApiResult<StartedChat>>;

    /// Submit files into a chat; returns the backend's status message.
    ///
    /// # Errors
    /// Returns an error if a file cannot be read or the request fails.
    fn upload(&self, request: UploadRequest) -> ApiFuture<'_, ApiResult<String>>;

    /// Ask a question about the chat's documents.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    fn query(&self, request: QueryRequest) -> ApiFuture<'_, ApiResult<QueryAnswer>>;

    /// Load every past exchange of a chat, oldest first.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    fn chat_history(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> ApiFuture<'_, ApiResult<Vec<HistoryEntry>>>;

    /// List the user's chats.
    ///
    /// # Errors
    /// Returns an error if the request fails.
    fn list_chats(&self, user_id: UserId) -> ApiFuture<'_, ApiResult<Vec<ChatSummary>>>;
}
