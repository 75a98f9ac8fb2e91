//! Request and response types exchanged with the chat backend.

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::staging::StagedFile;
use crate::core::ids::{ChatId, UserId};

/// A cited passage backing an answer.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Source {
    /// Name of the uploaded document the passage comes from.
    pub document_name: String,
    /// Excerpt of the passage.
    pub excerpt: String,
    /// One-based page number, when the backend knows it.
    pub page_number: Option<NonZeroU32>,
}

impl Source {
    /// Build a source citation.
    #[must_use]
    pub fn new(
        document_name: impl Into<String>,
        excerpt: impl Into<String>,
        page_number: Option<u32>,
    ) -> Self {
        Self {
            document_name: document_name.into(),
            excerpt: excerpt.into(),
            page_number: page_number.and_then(NonZeroU32::new),
        }
    }
}

/// Summary of one chat in the user's chat list.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct ChatSummary {
    /// Chat identifier.
    pub chat_id: ChatId,
    /// Names of the documents uploaded into the chat, in upload order.
    #[serde(rename = "documents", default)]
    pub document_names: Vec<String>,
    /// Creation time of the chat.
    #[serde(with = "timestamp_serde")]
    pub created_at: DateTime<Utc>,
}

/// One past exchange of a chat, as stored by the backend.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct HistoryEntry {
    /// Query the user sent.
    pub query: String,
    /// Answer the backend gave.
    pub response: String,
}

/// Chat created (or reused) by the backend.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
pub struct StartedChat {
    /// Chat identifier.
    pub chat_id: ChatId,
    /// User the chat belongs to; a fresh guest id when none was sent.
    pub user_id: UserId,
}

/// Answer to a query.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryAnswer {
    /// Answer text.
    pub text: String,
    /// Every source the backend cited, in backend order.
    pub sources: Vec<Source>,
}

/// Parameters of a query call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QueryRequest {
    /// Query text as typed by the user.
    pub query: String,
    /// User scoping the query, when known.
    pub user_id: Option<UserId>,
    /// Chat the query belongs to.
    pub chat_id: ChatId,
}

/// Parameters of a multipart upload call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UploadRequest {
    /// User owning the chat.
    pub user_id: UserId,
    /// Chat receiving the documents.
    pub chat_id: ChatId,
    /// Files to submit, in staging order.
    pub files: Vec<StagedFile>,
}

/// Wire shape of `GET start_chat`.
pub(crate) type StartChatResponse = StartedChat;

/// Wire shape of `POST upload`.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    pub message: String,
}

/// Wire shape of `GET query`.
#[derive(Debug, Deserialize)]
pub(crate) struct QueryResponse {
    response: ResponseBody,
    #[serde(default)]
    sources: Option<Vec<WireSource>>,
}

/// The answer text is either a bare string or wrapped in another object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseBody {
    Text(String),
    Nested { response: String },
}

/// Older backends cite bare excerpt strings instead of objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireSource {
    Excerpt(String),
    Detailed(DetailedSource),
}

#[derive(Debug, Deserialize)]
struct DetailedSource {
    #[serde(default)]
    document_name: String,
    #[serde(default, alias = "excerpt")]
    source_text: String,
    #[serde(default)]
    page_number: Option<u32>,
}

impl From<WireSource> for Source {
    fn from(wire: WireSource) -> Self {
        match wire {
            WireSource::Excerpt(text) => Self::new(String::new(), text, None),
            WireSource::Detailed(source) => Self::new(
                source.document_name,
                source.source_text,
                source.page_number,
            ),
        }
    }
}

impl From<QueryResponse> for QueryAnswer {
    fn from(wire: QueryResponse) -> Self {
        let text = match wire.response {
            ResponseBody::Text(text) | ResponseBody::Nested { response: text } => text,
        };
        let sources = wire
            .sources
            .unwrap_or_default()
            .into_iter()
            .map(Source::from)
            .collect();
        Self { text, sources }
    }
}

/// Wire shape of `GET chat-history`.
#[derive(Debug, Deserialize)]
pub(crate) struct HistoryResponse {
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

/// Wire shape of `GET get_chats`.
#[derive(Debug, Deserialize)]
pub(crate) struct ChatsResponse {
    #[serde(default)]
    pub chats: Vec<ChatSummary>,
}

/// Serde module for timestamps sent as RFC 3339 text or epoch seconds.
mod timestamp_serde {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawTimestamp {
        Seconds(i64),
        Fractional(f64),
        Text(String),
    }

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let parsed = match RawTimestamp::deserialize(deserializer)? {
            RawTimestamp::Seconds(secs) => DateTime::from_timestamp(secs, 0),
            RawTimestamp::Fractional(secs) => {
                DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
            }
            RawTimestamp::Text(text) => DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    // Naive ISO timestamps are taken as UTC.
                    NaiveDateTime::parse_from_str(&text, "%Y-%m-%dT%H:%M:%S%.f")
                        .ok()
                        .map(|naive| naive.and_utc())
                }),
        };
        parsed.ok_or_else(|| D::Error::custom("invalid chat timestamp"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_plain_text() {
        let wire: QueryResponse = serde_json::from_str(
            r#"{"response":"X is...","sources":[{"document_name":"a.pdf","source_text":"...","page_number":3}]}"#,
        )
        .unwrap();
        let answer = QueryAnswer::from(wire);
        assert_eq!(answer.text, "X is...");
        assert_eq!(answer.sources, vec![Source::new("a.pdf", "...", Some(3))]);
    }

    #[test]
    fn test_query_response_nested_without_sources() {
        let wire: QueryResponse =
            serde_json::from_str(r#"{"response":{"response":"nested"}}"#).unwrap();
        let answer = QueryAnswer::from(wire);
        assert_eq!(answer.text, "nested");
        assert!(answer.sources.is_empty());
    }

    #[test]
    fn test_bare_string_sources_and_zero_page() {
        let wire: QueryResponse = serde_json::from_str(
            r#"{"response":"ok","sources":["first 200 chars...",{"document_name":"b.pdf","excerpt":"e","page_number":0}]}"#,
        )
        .unwrap();
        let answer = QueryAnswer::from(wire);
        assert_eq!(answer.sources[0].excerpt, "first 200 chars...");
        assert!(answer.sources[0].document_name.is_empty());
        assert_eq!(answer.sources[1].excerpt, "e");
        assert!(answer.sources[1].page_number.is_none());
    }

    #[test]
    fn test_chat_summary_timestamps() {
        let wire: ChatsResponse = serde_json::from_str(
            r#"{"chats":[
                {"chat_id":"c1","documents":["a.pdf","b.pdf"],"created_at":"2025-01-02T03:04:05Z"},
                {"chat_id":"c2","documents":[],"created_at":1735787045},
                {"chat_id":"c3","created_at":"2025-01-02T03:04:05.250"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(wire.chats.len(), 3);
        assert_eq!(wire.chats[0].document_names, vec!["a.pdf", "b.pdf"]);
        assert_eq!(wire.chats[0].created_at.timestamp(), 1_735_787_045);
        assert_eq!(wire.chats[1].created_at, wire.chats[0].created_at);
        assert!(wire.chats[2].document_names.is_empty());
        assert_eq!(wire.chats[2].created_at.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_invalid_timestamp_is_rejected() {
        let result: Result<ChatsResponse, _> = serde_json::from_str(
            r#"{"chats":[{"chat_id":"c1","documents":[],"created_at":"yesterday"}]}"#,
        );
        assert!(result.is_err());
    }
}
