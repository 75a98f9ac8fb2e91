//! `unstuck` command-line front end.

pub mod args;
pub mod render;
pub mod repl;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::Level;

use crate::chat::staging::{StagedFile, StagingBuffer};
use crate::chat::transcript::{HistoryLoad, QueryOutcome};
use crate::chat::upload::UploadTarget;
use crate::client::ChatClient;
use crate::core::ids::ChatId;

pub use args::{Cli, Command};

/// Parse arguments, run the command and map the outcome to an exit code.
///
/// # Returns
/// `ExitCode::SUCCESS` on success, `1` on failure.
#[must_use]
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Starting unstuck v{}", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to create runtime: {e}");
            return ExitCode::from(1);
        }
    };

    if let Err(e) = rt.block_on(execute(cli)) {
        tracing::error!("{e:#}");
        return ExitCode::from(1);
    }

    ExitCode::SUCCESS
}

async fn execute(cli: Cli) -> Result<()> {
    let config = cli.client_config().context("failed to load configuration")?;
    let client = ChatClient::from_config(config).context("failed to set up the client")?;

    match cli.command {
        Command::Upload { files, chat } => upload(&client, files, chat).await,
        Command::Ask { chat, question } => ask(&client, chat, &question.join(" ")).await,
        Command::History { chat } => history(&client, chat).await,
        Command::Chats => chats(&client).await,
        Command::Whoami => {
            println!("{}", client.identity());
            Ok(())
        }
        Command::Logout => {
            client.sign_out()?;
            println!("signed out; the next upload starts a new guest session");
            Ok(())
        }
        Command::Chat { chat } => repl::run(&client, chat).await,
    }
}

async fn upload(client: &ChatClient, files: Vec<PathBuf>, chat: Option<ChatId>) -> Result<()> {
    let mut staging = StagingBuffer::new();
    staging.add(files.into_iter().map(StagedFile::new));
    let target = chat.map_or(UploadTarget::NewChat, UploadTarget::Existing);

    let receipt = client.upload(&mut staging, target).await?;
    println!("{}", receipt.message);
    println!("chat: {}", receipt.chat_id);
    println!("identity: {}", receipt.identity);
    Ok(())
}

async fn ask(client: &ChatClient, chat: ChatId, question: &str) -> Result<()> {
    let transcript = client.open_chat(chat);
    match transcript.submit_query(question).await? {
        QueryOutcome::Answered { index } => {
            if let Some(message) = transcript.messages().get(index) {
                println!("{}", render::message(message));
            }
            Ok(())
        }
        QueryOutcome::Failed { reason, .. } => bail!("query failed: {reason}"),
        QueryOutcome::Discarded => bail!("answer was discarded"),
    }
}

async fn history(client: &ChatClient, chat: ChatId) -> Result<()> {
    let transcript = client.open_chat(chat);
    match transcript.load_history().await? {
        HistoryLoad::Skipped => println!("no history: this device has no user id yet"),
        HistoryLoad::Loaded { exchanges: 0 } => println!("no exchanges yet"),
        HistoryLoad::Loaded { .. } => {
            for message in transcript.messages() {
                println!("{}", render::message(&message));
            }
        }
    }
    Ok(())
}

async fn chats(client: &ChatClient) -> Result<()> {
    let chats = client.chats().await?;
    if chats.is_empty() {
        println!("no chats yet");
    }
    for chat in &chats {
        println!("{}", render::chat_summary(chat));
    }
    Ok(())
}
