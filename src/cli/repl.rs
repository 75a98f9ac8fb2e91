//! Interactive chat session.
//!
//! Plain lines are queries against the open chat. Lines starting with `:`
//! drive the staging buffer and uploads.

use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::chat::staging::{StagedFile, StagingBuffer};
use crate::chat::transcript::{ChatTranscript, HistoryLoad, QueryOutcome};
use crate::chat::upload::UploadTarget;
use crate::cli::render;
use crate::client::ChatClient;
use crate::core::ids::ChatId;

const HELP: &str = "\
:add <file>...  stage files for upload
:rm <n>         unstage file number n
:clear          unstage everything
:files          list staged files
:upload         upload staged files (into the open chat, if any)
:chats          list your chats
:open <chat>    switch to another chat
:help           show this help
:quit           leave";

/// One parsed input line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplCommand {
    /// Ask the open chat.
    Query(String),
    /// Stage files.
    Add(Vec<PathBuf>),
    /// Unstage the file at this zero-based index.
    Remove(usize),
    /// Unstage everything.
    Clear,
    /// List staged files.
    Files,
    /// Upload staged files.
    Upload,
    /// List chats.
    Chats,
    /// Switch chat.
    Open(ChatId),
    /// Show help.
    Help,
    /// Leave the session.
    Quit,
    /// Blank line.
    Nothing,
    /// Unusable input, with a hint.
    Invalid(String),
}

/// Parse one input line.
#[must_use]
pub fn parse_line(line: &str) -> ReplCommand {
    let line = line.trim();
    if line.is_empty() {
        return ReplCommand::Nothing;
    }
    let Some(rest) = line.strip_prefix(':') else {
        return ReplCommand::Query(line.to_string());
    };

    let mut words = rest.split_whitespace();
    let name = words.next().unwrap_or_default();
    let args: Vec<&str> = words.collect();
    match (name, args.as_slice()) {
        ("add", []) => ReplCommand::Invalid("usage: :add <file>...".to_string()),
        ("add", files) => ReplCommand::Add(files.iter().map(PathBuf::from).collect()),
        ("rm", [n]) => match n.parse::<usize>() {
            Ok(n) if n > 0 => ReplCommand::Remove(n - 1),
            _ => ReplCommand::Invalid(format!("not a file number: {n}")),
        },
        ("rm", _) => ReplCommand::Invalid("usage: :rm <n>".to_string()),
        ("open", [id]) => id
            .parse()
            .map_or_else(|e| ReplCommand::Invalid(e.to_string()), ReplCommand::Open),
        ("open", _) => ReplCommand::Invalid("usage: :open <chat>".to_string()),
        ("clear", []) => ReplCommand::Clear,
        ("files", []) => ReplCommand::Files,
        ("upload", []) => ReplCommand::Upload,
        ("chats", []) => ReplCommand::Chats,
        ("help" | "h" | "?", []) => ReplCommand::Help,
        ("quit" | "q" | "exit", []) => ReplCommand::Quit,
        _ => ReplCommand::Invalid(format!("unknown command :{rest} (try :help)")),
    }
}

struct Session<'a> {
    client: &'a ChatClient,
    staging: StagingBuffer,
    transcript: Option<ChatTranscript>,
}

impl Session<'_> {
    async fn open(&mut self, chat_id: ChatId) {
        let transcript = self.client.open_chat(chat_id);
        match transcript.load_history().await {
            Ok(HistoryLoad::Loaded { exchanges }) => {
                for message in transcript.messages() {
                    println!("{}", render::message(&message));
                }
                println!("-- chat {} ({exchanges} past exchanges)", transcript.chat_id());
            }
            Ok(HistoryLoad::Skipped) => println!("-- chat {}", transcript.chat_id()),
            Err(err) => println!("could not load history: {err}"),
        }
        self.transcript = Some(transcript);
    }

    async fn ask(&self, text: &str) {
        let Some(transcript) = &self.transcript else {
            println!("no chat open: stage files with :add and :upload, or :open <chat>");
            return;
        };
        match transcript.submit_query(text).await {
            Ok(QueryOutcome::Answered { index } | QueryOutcome::Failed { index, .. }) => {
                if let Some(message) = transcript.messages().get(index) {
                    println!("{}", render::message(message));
                }
            }
            Ok(QueryOutcome::Discarded) => debug!("answer discarded"),
            Err(err) => println!("{err}"),
        }
    }

    async fn upload(&mut self) {
        let target = self
            .transcript
            .as_ref()
            .map_or(UploadTarget::NewChat, |t| {
                UploadTarget::Existing(t.chat_id().clone())
            });
        let count = self.staging.len();
        match self.client.upload(&mut self.staging, target.clone()).await {
            Ok(receipt) => {
                println!("{} ({count} files)", receipt.message);
                if target == UploadTarget::NewChat
                    || self.transcript.as_ref().map(ChatTranscript::chat_id)
                        != Some(&receipt.chat_id)
                {
                    self.transcript = Some(self.client.open_chat(receipt.chat_id.clone()));
                    println!("-- chat {}", receipt.chat_id);
                }
            }
            Err(err) => println!("upload failed: {err}"),
        }
    }

    async fn chats(&self) {
        match self.client.chats().await {
            Ok(chats) if chats.is_empty() => println!("no chats yet"),
            Ok(chats) => {
                for chat in &chats {
                    println!("{}", render::chat_summary(chat));
                }
            }
            Err(err) => println!("could not list chats: {err}"),
        }
    }

    /// Apply one command; false ends the session.
    async fn apply(&mut self, command: ReplCommand) -> bool {
        match command {
            ReplCommand::Query(text) => self.ask(&text).await,
            ReplCommand::Add(paths) => {
                self.staging.add(paths.into_iter().map(StagedFile::new));
                println!("{}", render::staged_files(&self.staging));
            }
            ReplCommand::Remove(index) => match self.staging.remove(index) {
                Ok(file) => println!("removed {}", file.name),
                Err(err) => println!("{err}"),
            },
            ReplCommand::Clear => {
                self.staging.clear();
                println!("{}", render::staged_files(&self.staging));
            }
            ReplCommand::Files => println!("{}", render::staged_files(&self.staging)),
            ReplCommand::Upload => self.upload().await,
            ReplCommand::Chats => self.chats().await,
            ReplCommand::Open(chat_id) => self.open(chat_id).await,
            ReplCommand::Help => println!("{HELP}"),
            ReplCommand::Quit => return false,
            ReplCommand::Nothing => {}
            ReplCommand::Invalid(hint) => println!("{hint}"),
        }
        true
    }
}

/// Run the session until `:quit` or end of input.
///
/// # Errors
/// Returns an error if standard input cannot be read.
pub async fn run(client: &ChatClient, chat: Option<ChatId>) -> Result<()> {
    let mut session = Session {
        client,
        staging: StagingBuffer::new(),
        transcript: None,
    };
    println!("identity: {} (:help for commands)", client.identity());
    if let Some(chat_id) = chat {
        session.open(chat_id).await;
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !session.apply(parse_line(&line)).await {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_lines_are_queries() {
        assert_eq!(
            parse_line("  What is X?  "),
            ReplCommand::Query("What is X?".to_string())
        );
        assert_eq!(parse_line("   "), ReplCommand::Nothing);
    }

    #[test]
    fn test_staging_commands() {
        assert_eq!(
            parse_line(":add a.pdf b.pdf"),
            ReplCommand::Add(vec![PathBuf::from("a.pdf"), PathBuf::from("b.pdf")])
        );
        assert_eq!(parse_line(":rm 2"), ReplCommand::Remove(1));
        assert_eq!(parse_line(":clear"), ReplCommand::Clear);
        assert_eq!(parse_line(":files"), ReplCommand::Files);
        assert_eq!(parse_line(":upload"), ReplCommand::Upload);
    }

    #[test]
    fn test_bad_input_gets_a_hint() {
        assert!(matches!(parse_line(":rm 0"), ReplCommand::Invalid(_)));
        assert!(matches!(parse_line(":rm x"), ReplCommand::Invalid(_)));
        assert!(matches!(parse_line(":add"), ReplCommand::Invalid(_)));
        assert!(matches!(parse_line(":frobnicate"), ReplCommand::Invalid(_)));
        assert!(matches!(parse_line(":open"), ReplCommand::Invalid(_)));
    }

    #[test]
    fn test_navigation_commands() {
        assert_eq!(parse_line(":open c7"), ReplCommand::Open(ChatId::new("c7")));
        assert_eq!(parse_line(":chats"), ReplCommand::Chats);
        assert_eq!(parse_line(":q"), ReplCommand::Quit);
        assert_eq!(parse_line(":help"), ReplCommand::Help);
    }
}
