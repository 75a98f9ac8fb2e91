//! Chat transcript store: the message log of one chat and its single in-flight query.
//!
//! The log is an indexed, mutable arena. Submitting a query appends the user
//! message and a pending bot placeholder and records the placeholder's slot;
//! the answer (or failure) later overwrites exactly that slot. Only one slot
//! can be pending at a time, which is what enforces single-flight.
//!
//! The backend call runs as a detached task holding a weak reference to the
//! log: dropping the transcript does not abort the request, its result is
//! simply discarded.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::backend::ChatBackend;
use crate::api::types::{HistoryEntry, QueryRequest};
use crate::chat::message::Message;
use crate::core::errors::{ClientError, ClientResult};
use crate::core::ids::ChatId;
use crate::session::identity::SessionIdentity;

/// Query lifecycle of a transcript.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TranscriptState {
    /// Ready to accept a query.
    Idle,
    /// A placeholder is waiting for its answer.
    AwaitingAnswer,
}

/// How a submitted query settled.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum QueryOutcome {
    /// The placeholder at `index` now holds the answer.
    Answered {
        /// Position of the answer in the transcript.
        index: usize,
    },
    /// The placeholder at `index` now holds the failure message.
    Failed {
        /// Position of the failure message in the transcript.
        index: usize,
        /// Why the backend call failed.
        reason: String,
    },
    /// The transcript was reloaded or dropped before the answer arrived.
    Discarded,
}

/// Result of a history load.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HistoryLoad {
    /// The transcript was rebuilt from this many past exchanges.
    Loaded {
        /// Number of query/answer pairs loaded.
        exchanges: usize,
    },
    /// No user id is known yet, so there is no history to fetch.
    Skipped,
}

/// Position of the pending placeholder, tagged with the log generation it
/// was created in.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct PendingSlot {
    index: usize,
    generation: u64,
}

#[derive(Debug, Default)]
struct TranscriptLog {
    messages: Vec<Message>,
    pending: Option<PendingSlot>,
    generation: u64,
}

impl TranscriptLog {
    fn begin(&mut self, query: &str) -> ClientResult<PendingSlot> {
        if self.pending.is_some() {
            return Err(ClientError::QueryInFlight);
        }
        if query.trim().is_empty() {
            return Err(ClientError::EmptyQuery);
        }

        self.messages.push(Message::user(query));
        self.messages.push(Message::pending());
        let slot = PendingSlot {
            index: self.messages.len() - 1,
            generation: self.generation,
        };
        self.pending = Some(slot);
        Ok(slot)
    }

    /// Overwrite the placeholder; false if `slot` is no longer the pending one.
    fn resolve(&mut self, slot: PendingSlot, message: Message) -> bool {
        if self.pending != Some(slot) {
            return false;
        }
        if let Some(entry) = self.messages.get_mut(slot.index) {
            *entry = message;
        }
        self.pending = None;
        true
    }

    fn replace_with_history(&mut self, entries: Vec<HistoryEntry>) {
        self.generation += 1;
        self.pending = None;
        self.messages = entries
            .into_iter()
            .flat_map(|entry| {
                [
                    Message::user(entry.query),
                    Message::bot(entry.response, Vec::new()),
                ]
            })
            .collect();
    }
}

/// Message log and query state machine for one chat.
pub struct ChatTranscript {
    chat_id: ChatId,
    identity: SessionIdentity,
    backend: Arc<dyn ChatBackend>,
    log: Arc<Mutex<TranscriptLog>>,
}

impl ChatTranscript {
    /// Open an empty transcript for `chat_id`, scoped to `identity`.
    #[must_use]
    pub fn new(chat_id: ChatId, identity: SessionIdentity, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            chat_id,
            identity,
            backend,
            log: Arc::new(Mutex::new(TranscriptLog::default())),
        }
    }

    /// Chat this transcript belongs to.
    #[must_use]
    pub const fn chat_id(&self) -> &ChatId {
        &self.chat_id
    }

    /// Identity queries are scoped to.
    #[must_use]
    pub const fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Current query state.
    #[must_use]
    pub fn state(&self) -> TranscriptState {
        if self.log.lock().pending.is_some() {
            TranscriptState::AwaitingAnswer
        } else {
            TranscriptState::Idle
        }
    }

    /// Snapshot of the messages in order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.log.lock().messages.clone()
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.log.lock().messages.len()
    }

    /// Whether the transcript has no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log.lock().messages.is_empty()
    }

    /// Submit a query and wait until its placeholder settles.
    ///
    /// Backend failures do not surface here: they settle the placeholder as an
    /// error message and come back as [`QueryOutcome::Failed`].
    ///
    /// # Errors
    /// Returns `QueryInFlight` or `EmptyQuery` without touching the transcript.
    pub async fn submit_query(&self, text: &str) -> ClientResult<QueryOutcome> {
        let slot = self.log.lock().begin(text)?;
        let handle = self.spawn_resolution(slot, text);
        match handle.await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                warn!(chat_id = %self.chat_id, error = %err, "query task aborted");
                let settled = self.log.lock().resolve(slot, Message::failed());
                Ok(if settled {
                    QueryOutcome::Failed {
                        index: slot.index,
                        reason: err.to_string(),
                    }
                } else {
                    QueryOutcome::Discarded
                })
            }
        }
    }

    /// Submit a query without waiting; the returned task settles the placeholder.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `QueryInFlight` or `EmptyQuery` without touching the transcript.
    pub fn spawn_query(&self, text: &str) -> ClientResult<JoinHandle<QueryOutcome>> {
        let slot = self.log.lock().begin(text)?;
        Ok(self.spawn_resolution(slot, text))
    }

    fn spawn_resolution(&self, slot: PendingSlot, text: &str) -> JoinHandle<QueryOutcome> {
        info!(chat_id = %self.chat_id, index = slot.index, "query submitted");
        let request = QueryRequest {
            query: text.to_string(),
            user_id: self.identity.user_id().cloned(),
            chat_id: self.chat_id.clone(),
        };
        tokio::spawn(run_query(
            Arc::clone(&self.backend),
            Arc::downgrade(&self.log),
            slot,
            request,
        ))
    }

    /// Rebuild the transcript from the backend's history of this chat.
    ///
    /// The transcript is replaced, not merged: earlier messages and any
    /// pending placeholder are dropped, and a late answer to that placeholder
    /// is discarded.
    ///
    /// # Errors
    /// Returns a network error if the history cannot be fetched; the transcript
    /// is left unchanged in that case.
    pub async fn load_history(&self) -> ClientResult<HistoryLoad> {
        let Some(user_id) = self.identity.user_id().cloned() else {
            debug!(chat_id = %self.chat_id, "no user id yet, skipping history load");
            return Ok(HistoryLoad::Skipped);
        };

        let entries = self
            .backend
            .chat_history(user_id, self.chat_id.clone())
            .await?;
        let exchanges = entries.len();
        self.log.lock().replace_with_history(entries);
        info!(chat_id = %self.chat_id, exchanges, "history loaded");
        Ok(HistoryLoad::Loaded { exchanges })
    }
}

async fn run_query(
    backend: Arc<dyn ChatBackend>,
    log: Weak<Mutex<TranscriptLog>>,
    slot: PendingSlot,
    request: QueryRequest,
) -> QueryOutcome {
    let chat_id = request.chat_id.clone();
    let result = backend.query(request).await;

    let Some(log) = log.upgrade() else {
        debug!(%chat_id, "transcript dropped before the answer arrived");
        return QueryOutcome::Discarded;
    };

    let (message, outcome) = match result {
        Ok(answer) => {
            debug!(%chat_id, sources = answer.sources.len(), "answer received");
            (
                Message::bot(answer.text, answer.sources),
                QueryOutcome::Answered { index: slot.index },
            )
        }
        Err(err) => {
            warn!(%chat_id, error = %err, "query failed");
            (
                Message::failed(),
                QueryOutcome::Failed {
                    index: slot.index,
                    reason: err.to_string(),
                },
            )
        }
    };

    if log.lock().resolve(slot, message) {
        outcome
    } else {
        debug!(%chat_id, "transcript reloaded before the answer arrived");
        QueryOutcome::Discarded
    }
}
