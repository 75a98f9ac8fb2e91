//! Backend API layer.
//!
//! The chat components talk to the retrieval/answer service only through the
//! [`ChatBackend`] trait:
//! - `start_chat`: create a chat, allocating a guest id when needed
//! - `upload`: multipart submission of staged files
//! - `query`: ask a question, receive an answer with cited sources
//! - `chat_history`: every past exchange of a chat
//! - `list_chats`: summaries of the user's chats

pub mod backend;
pub mod error;
pub mod http;
pub mod types;

#[cfg(test)]
pub(crate) mod fake;

pub use backend::{ApiFuture, ChatBackend};
pub use error::{ApiError, ApiResult};
pub use http::HttpBackend;
pub use types::{
    ChatSummary, HistoryEntry, QueryAnswer, QueryRequest, Source, StartedChat, UploadRequest,
};
