//! Transcript message model.

use std::fmt;

use serde::Serialize;

use crate::api::types::Source;

/// Number of sources shown under an answer; the rest stay in the model.
pub const MAX_DISPLAYED_SOURCES: usize = 4;

/// Placeholder text of a bot message awaiting its answer.
pub const PENDING_TEXT: &str = "Thinking";

/// Text of a bot message whose query failed.
pub const QUERY_FAILED_TEXT: &str = "Sorry, I encountered an error processing your query.";

/// Author of a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Typed by the user.
    User,
    /// Produced by the answer service.
    Bot,
}

impl Sender {
    /// Stable string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Bot => "bot",
        }
    }
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Settled message.
    Normal,
    /// Bot placeholder while the query is in flight.
    Pending,
    /// Bot message standing in for a failed query.
    Error,
}

/// One entry of a transcript.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Message {
    /// Author.
    pub sender: Sender,
    /// Message text.
    pub text: String,
    /// Lifecycle state.
    pub kind: MessageKind,
    /// Every cited source, in backend order.
    pub sources: Vec<Source>,
}

impl Message {
    /// Message typed by the user.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            kind: MessageKind::Normal,
            sources: Vec::new(),
        }
    }

    /// Settled bot answer.
    #[must_use]
    pub fn bot(text: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            kind: MessageKind::Normal,
            sources,
        }
    }

    /// Bot placeholder for an in-flight query.
    #[must_use]
    pub fn pending() -> Self {
        Self {
            sender: Sender::Bot,
            text: PENDING_TEXT.to_string(),
            kind: MessageKind::Pending,
            sources: Vec::new(),
        }
    }

    /// Bot message for a failed query.
    #[must_use]
    pub fn failed() -> Self {
        Self {
            sender: Sender::Bot,
            text: QUERY_FAILED_TEXT.to_string(),
            kind: MessageKind::Error,
            sources: Vec::new(),
        }
    }

    /// Whether this is the in-flight placeholder.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.kind, MessageKind::Pending)
    }

    /// Sources to render: the first [`MAX_DISPLAYED_SOURCES`].
    #[must_use]
    pub fn displayed_sources(&self) -> &[Source] {
        let end = self.sources.len().min(MAX_DISPLAYED_SOURCES);
        &self.sources[..end]
    }
}
