//! Session identity and the locally persisted guest id.

pub mod guest_store;
pub mod identity;

pub use guest_store::{FileGuestIdStore, GuestIdStore, MemoryGuestIdStore};
pub use identity::{IdentityProvider, SessionIdentity};
