//! Chat-side state: staging, uploads, transcripts and the chat list.
//!
//! Components share two pieces of process-wide state, both created by
//! [`crate::client::ChatClient`] and passed in explicitly:
//! - the [`ChatListVersion`] counter, bumped after every successful upload
//! - the identity provider owning the persisted guest id

pub mod chat_list;
pub mod message;
pub mod staging;
pub mod transcript;
pub mod upload;
pub mod version;

pub use chat_list::ChatListCache;
pub use message::{MAX_DISPLAYED_SOURCES, Message, MessageKind, Sender};
pub use staging::{StagedFile, StagingBuffer};
pub use transcript::{ChatTranscript, HistoryLoad, QueryOutcome, TranscriptState};
pub use upload::{UploadCoordinator, UploadPhase, UploadReceipt, UploadTarget};
pub use version::ChatListVersion;
