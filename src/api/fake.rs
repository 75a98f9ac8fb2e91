//! Scripted in-memory backend for component tests.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::api::backend::{ApiFuture, ChatBackend};
use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{
    ChatSummary, HistoryEntry, QueryAnswer, QueryRequest, StartedChat, UploadRequest,
};
use crate::core::ids::{ChatId, UserId};

/// A call observed by the fake backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    StartChat(Option<UserId>),
    Upload(UploadRequest),
    Query(QueryRequest),
    History(UserId, ChatId),
    ListChats(UserId),
}

/// Backend answering from per-endpoint scripts, oldest entry first.
#[derive(Default)]
pub(crate) struct FakeBackend {
    started: Mutex<VecDeque<ApiResult<StartedChat>>>,
    uploads: Mutex<VecDeque<ApiResult<String>>>,
    answers: Mutex<VecDeque<ApiResult<QueryAnswer>>>,
    histories: Mutex<VecDeque<ApiResult<Vec<HistoryEntry>>>>,
    chat_lists: Mutex<VecDeque<ApiResult<Vec<ChatSummary>>>>,
    calls: Mutex<Vec<Call>>,
    gate: Option<Arc<Notify>>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Hold every reply until the returned notifier releases it.
    pub(crate) fn gated() -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let backend = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (backend, gate)
    }

    pub(crate) fn push_started(&self, chat_id: &str, user_id: &str) {
        self.started.lock().push_back(Ok(StartedChat {
            chat_id: ChatId::new(chat_id),
            user_id: UserId::new(user_id),
        }));
    }

    pub(crate) fn push_start_error(&self, err: ApiError) {
        self.started.lock().push_back(Err(err));
    }

    pub(crate) fn push_upload(&self, result: ApiResult<String>) {
        self.uploads.lock().push_back(result);
    }

    pub(crate) fn push_answer(&self, result: ApiResult<QueryAnswer>) {
        self.answers.lock().push_back(result);
    }

    pub(crate) fn push_history(&self, result: ApiResult<Vec<HistoryEntry>>) {
        self.histories.lock().push_back(result);
    }

    pub(crate) fn push_chats(&self, result: ApiResult<Vec<ChatSummary>>) {
        self.chat_lists.lock().push_back(result);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    async fn reply<T>(&self, call: Call, script: &Mutex<VecDeque<ApiResult<T>>>) -> ApiResult<T> {
        self.calls.lock().push(call);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Other("unscripted call".to_string())))
    }
}

impl ChatBackend for FakeBackend {
    fn start_chat(&self, user_id: Option<UserId>) -> ApiFuture<'_, ApiResult<StartedChat>> {
        Box::pin(self.reply(Call::StartChat(user_id), &self.started))
    }

    fn upload(&self, request: UploadRequest) -> ApiFuture<'_, ApiResult<String>> {
        Box::pin(self.reply(Call::Upload(request), &self.uploads))
    }

    fn query(&self, request: QueryRequest) -> ApiFuture<'_, ApiResult<QueryAnswer>> {
        Box::pin(self.reply(Call::Query(request), &self.answers))
    }

    fn chat_history(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> ApiFuture<'_, ApiResult<Vec<HistoryEntry>>> {
        Box::pin(self.reply(Call::History(user_id, chat_id), &self.histories))
    }

    fn list_chats(&self, user_id: UserId) -> ApiFuture<'_, ApiResult<Vec<ChatSummary>>> {
        Box::pin(self.reply(Call::ListChats(user_id), &self.chat_lists))
    }
}
