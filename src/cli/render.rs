//! Plain-text rendering of transcripts, sources and chat lists.

use crate::api::types::{ChatSummary, Source};
use crate::chat::message::{Message, MessageKind, Sender};
use crate::chat::staging::StagingBuffer;

const USER_PREFIX: &str = "you> ";
const BOT_PREFIX: &str = "bot> ";
const SOURCE_INDENT: &str = "     ";
const EXCERPT_CHARS: usize = 160;

/// Render one message, followed by its displayed sources.
#[must_use]
pub fn message(message: &Message) -> String {
    let prefix = match message.sender {
        Sender::User => USER_PREFIX,
        Sender::Bot => BOT_PREFIX,
    };
    let head = match message.kind {
        MessageKind::Normal => format!("{prefix}{}", message.text),
        MessageKind::Pending => format!("{prefix}{}...", message.text),
        MessageKind::Error => format!("{prefix}[error] {}", message.text),
    };
    let sources = message
        .displayed_sources()
        .iter()
        .enumerate()
        .map(|(n, source)| format!("{SOURCE_INDENT}[{}] {}", n + 1, self::source(source)));
    std::iter::once(head)
        .chain(sources)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a source citation on one line.
#[must_use]
pub fn source(source: &Source) -> String {
    let excerpt = shorten(source.excerpt.trim(), EXCERPT_CHARS);
    let name = if source.document_name.is_empty() {
        "document"
    } else {
        source.document_name.as_str()
    };
    source.page_number.map_or_else(
        || format!("{name}: \"{excerpt}\""),
        |page| format!("{name} p.{page}: \"{excerpt}\""),
    )
}

/// Render a chat list entry.
#[must_use]
pub fn chat_summary(chat: &ChatSummary) -> String {
    let docs = if chat.document_names.is_empty() {
        "(no documents)".to_string()
    } else {
        chat.document_names.join(", ")
    };
    format!(
        "{}  {}  {docs}",
        chat.chat_id,
        chat.created_at.format("%Y-%m-%d %H:%M")
    )
}

/// Render the staged files, numbered from 1.
#[must_use]
pub fn staged_files(staging: &StagingBuffer) -> String {
    if staging.is_empty() {
        return "no files staged".to_string();
    }
    staging
        .names()
        .iter()
        .enumerate()
        .map(|(n, name)| format!("{:>3}. {name}", n + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

fn shorten(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
