//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::core::config::ClientConfig;
use crate::core::errors::ClientResult;
use crate::core::ids::{ChatId, EmptyIdError, UserId};

/// Chat with your documents from the terminal.
#[derive(Debug, Parser)]
#[command(name = "unstuck", version, about, long_about = None)]
pub struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "UNSTUCK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend base URL (overrides config and environment)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Signed-in account id (overrides config and environment)
    #[arg(long, global = true, value_parser = user_id_arg)]
    pub user_id: Option<UserId>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Upload documents into a new chat, or into an existing one
    Upload {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Existing chat to add the documents to
        #[arg(long, value_parser = chat_id_arg)]
        chat: Option<ChatId>,
    },

    /// Ask one question in a chat
    Ask {
        /// Chat to ask in
        #[arg(long, value_parser = chat_id_arg)]
        chat: ChatId,

        /// Question text
        #[arg(required = true, num_args = 1..)]
        question: Vec<String>,
    },

    /// Print the past exchanges of a chat
    History {
        /// Chat to show
        #[arg(long, value_parser = chat_id_arg)]
        chat: ChatId,
    },

    /// List your chats
    Chats,

    /// Show the identity calls are made with
    Whoami,

    /// Forget the signed-in account and the stored guest id
    Logout,

    /// Interactive chat session
    Chat {
        /// Chat to resume; without it, upload files first
        #[arg(long, value_parser = chat_id_arg)]
        chat: Option<ChatId>,
    },
}

// Ids go through `FromStr` so blank values are refused at parse time.
fn chat_id_arg(value: &str) -> Result<ChatId, EmptyIdError> {
    value.parse()
}

fn user_id_arg(value: &str) -> Result<UserId, EmptyIdError> {
    value.parse()
}

impl Cli {
    /// Resolve the effective config: file, then environment, then flags.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or parsed.
    pub fn client_config(&self) -> ClientResult<ClientConfig> {
        self.resolve_config(|key| std::env::var(key).ok())
    }

    fn resolve_config(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ClientResult<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_toml_file(path)?,
            None => ClientConfig::new(),
        }
        .with_overrides_from(lookup);

        if let Some(url) = &self.api_url {
            config = config.with_api_url(url.clone());
        }
        if let Some(user_id) = &self.user_id {
            config = config.with_account_id(user_id.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{API_URL_ENV, DEFAULT_API_URL, USER_ID_ENV};

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_parse_upload() {
        let cli = Cli::try_parse_from(["unstuck", "upload", "a.pdf", "b.pdf", "--chat", "c1"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Upload { ref files, ref chat }
                if *files == [PathBuf::from("a.pdf"), PathBuf::from("b.pdf")]
                    && chat.as_ref() == Some(&ChatId::new("c1"))
        ));
    }

    #[test]
    fn test_upload_requires_files() {
        assert!(Cli::try_parse_from(["unstuck", "upload"]).is_err());
    }

    #[test]
    fn test_ask_joins_words() {
        let cli =
            Cli::try_parse_from(["unstuck", "ask", "--chat", "c1", "what", "is", "X?"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Ask { ref chat, ref question }
                if chat.as_str() == "c1" && question.join(" ") == "what is X?"
        ));
    }

    #[test]
    fn test_blank_chat_id_is_rejected() {
        assert!(Cli::try_parse_from(["unstuck", "history", "--chat", "  "]).is_err());
        assert!(Cli::try_parse_from(["unstuck", "ask", "--chat", "", "hi"]).is_err());
        assert!(Cli::try_parse_from(["unstuck", "upload", "a.pdf", "--chat", " "]).is_err());
        assert!(Cli::try_parse_from(["unstuck", "chat", "--chat", ""]).is_err());
    }

    #[test]
    fn test_blank_user_id_is_rejected() {
        assert!(Cli::try_parse_from(["unstuck", "whoami", "--user-id", ""]).is_err());
        assert!(Cli::try_parse_from(["unstuck", "chats", "--user-id", "   "]).is_err());
    }

    #[test]
    fn test_ids_are_trimmed() {
        let cli =
            Cli::try_parse_from(["unstuck", "history", "--chat", " c1 ", "--user-id", " u1 "])
                .unwrap();
        assert!(matches!(cli.command, Command::History { ref chat } if chat.as_str() == "c1"));
        let config = cli.resolve_config(no_env).unwrap();
        assert_eq!(config.account_id, Some(UserId::new("u1")));
    }

    #[test]
    fn test_flags_override_environment() {
        let cli = Cli::try_parse_from([
            "unstuck",
            "whoami",
            "--api-url",
            "https://flag.example/",
        ])
        .unwrap();
        let env = |key: &str| match key {
            API_URL_ENV => Some("https://env.example/".to_string()),
            USER_ID_ENV => Some("env-user".to_string()),
            _ => None,
        };

        let config = cli.resolve_config(env).unwrap();

        assert_eq!(config.api.base_url, "https://flag.example/");
        assert_eq!(config.account_id, Some(UserId::new("env-user")));
    }

    #[test]
    fn test_config_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("unstuck.toml");
        std::fs::write(&path, "account_id = \"u1\"\n[api]\nbase_url = \"https://file.example/\"\n")
            .unwrap();
        let cli = Cli::try_parse_from([
            "unstuck",
            "chats",
            "--config",
            path.to_str().unwrap(),
            "--user-id",
            "u2",
        ])
        .unwrap();

        let config = cli.resolve_config(no_env).unwrap();

        assert_eq!(config.api.base_url, "https://file.example/");
        assert_eq!(config.account_id, Some(UserId::new("u2")));
    }

    #[test]
    fn test_defaults_without_sources() {
        let cli = Cli::try_parse_from(["unstuck", "chats"]).unwrap();
        let config = cli.resolve_config(no_env).unwrap();
        assert_eq!(config.api.base_url, DEFAULT_API_URL);
        assert!(config.account_id.is_none());
    }
}
