//! HTTP implementation of the chat backend.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::api::backend::{ApiFuture, ChatBackend};
use crate::api::error::{ApiError, ApiResult};
use crate::api::types::{
    ChatSummary, ChatsResponse, HistoryEntry, HistoryResponse, QueryAnswer, QueryRequest,
    QueryResponse, StartChatResponse, StartedChat, UploadRequest, UploadResponse,
};
use crate::core::config::ApiConfig;
use crate::core::errors::ClientResult;
use crate::core::ids::{ChatId, UserId};

/// Endpoint paths relative to the base URL.
const START_CHAT_PATH: &str = "start_chat/";
const UPLOAD_PATH: &str = "upload/";
const QUERY_PATH: &str = "query/";
const HISTORY_PATH: &str = "chat-history/";
const CHATS_PATH: &str = "get_chats/";

/// Backend reached over HTTP with `reqwest`.
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    /// Create a backend client from API settings.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &ApiConfig) -> ClientResult<Self> {
        let base = config.base()?;
        let client = Self::build_client(config)?;
        Ok(Self { client, base })
    }

    /// Base URL endpoints are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base
    }

    fn build_client(config: &ApiConfig) -> ApiResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut builder = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(config.user_agent.clone())
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| ApiError::HttpClient(e.to_string()))
    }

    fn endpoint(&self, path: &str) -> ApiResult<Url> {
        Ok(self.base.join(path)?)
    }

    /// Check the status and decode the JSON body.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> ApiResult<T> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let response = self.client.get(url).query(params).send().await?;
        Self::decode(response).await
    }

    async fn build_upload_form(request: UploadRequest) -> ApiResult<Form> {
        let mut form = Form::new()
            .text("user_id", request.user_id.into_string())
            .text("chat_id", request.chat_id.into_string());
        for file in request.files {
            let bytes = tokio::fs::read(&file.path)
                .await
                .map_err(|source| ApiError::FileRead {
                    path: file.path.clone(),
                    source,
                })?;
            let part = Part::bytes(bytes).file_name(file.name);
            form = form.part("files", part);
        }
        Ok(form)
    }
}

impl ChatBackend for HttpBackend {
    fn start_chat(&self, user_id: Option<UserId>) -> ApiFuture<'_, ApiResult<StartedChat>> {
        Box::pin(async move {
            let mut params = Vec::new();
            if let Some(user_id) = &user_id {
                params.push(("user_id", user_id.as_str()));
            }
            let started: StartChatResponse = self.get_json(START_CHAT_PATH, &params).await?;
            Ok(started)
        })
    }

    fn upload(&self, request: UploadRequest) -> ApiFuture<'_, ApiResult<String>> {
        Box::pin(async move {
            let url = self.endpoint(UPLOAD_PATH)?;
            let files = request.files.len();
            debug!(%url, files, chat_id = %request.chat_id, "POST upload");
            let form = Self::build_upload_form(request).await?;
            let response = self.client.post(url).multipart(form).send().await?;
            let body: UploadResponse = Self::decode(response).await?;
            Ok(body.message)
        })
    }

    fn query(&self, request: QueryRequest) -> ApiFuture<'_, ApiResult<QueryAnswer>> {
        Box::pin(async move {
            let mut params = vec![
                ("query", request.query.as_str()),
                ("chat_id", request.chat_id.as_str()),
            ];
            if let Some(user_id) = &request.user_id {
                params.push(("user_id", user_id.as_str()));
            }
            let body: QueryResponse = self.get_json(QUERY_PATH, &params).await?;
            Ok(QueryAnswer::from(body))
        })
    }

    fn chat_history(
        &self,
        user_id: UserId,
        chat_id: ChatId,
    ) -> ApiFuture<'_, ApiResult<Vec<HistoryEntry>>> {
        Box::pin(async move {
            let params = [("user_id", user_id.as_str()), ("chat_id", chat_id.as_str())];
            let body: HistoryResponse = self.get_json(HISTORY_PATH, &params).await?;
            Ok(body.history)
        })
    }

    fn list_chats(&self, user_id: UserId) -> ApiFuture<'_, ApiResult<Vec<ChatSummary>>> {
        Box::pin(async move {
            let params = [("user_id", user_id.as_str())];
            let body: ChatsResponse = self.get_json(CHATS_PATH, &params).await?;
            Ok(body.chats)
        })
    }
}
