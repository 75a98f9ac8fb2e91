//! Shared chat-list version counter.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

/// Monotonic counter signalling that the chat list changed on the backend.
///
/// Created once per process and cloned into every component that mutates
/// chats (writers call [`bump`](Self::bump)) or displays them (readers compare
/// [`current`](Self::current) or await [`subscribe`](Self::subscribe)). It is
/// never reset.
#[derive(Clone, Debug)]
pub struct ChatListVersion {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for ChatListVersion {
    fn default() -> Self {
        Self::new()
    }
}

impl ChatListVersion {
    /// Start a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Increment the counter and wake every subscriber; returns the new value.
    pub fn bump(&self) -> u64 {
        let mut next = 0;
        self.tx.send_modify(|version| {
            *version += 1;
            next = *version;
        });
        debug!(version = next, "chat list version bumped");
        next
    }

    /// Current counter value.
    #[must_use]
    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Receiver notified on every bump.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bump_n_times_advances_by_n() {
        let version = ChatListVersion::new();
        let reader = version.clone();
        let start = reader.current();

        for i in 1..=25 {
            let _ = reader.current();
            assert_eq!(version.bump(), start + i);
            let _ = reader.current();
        }

        assert_eq!(reader.current(), start + 25);
    }

    #[tokio::test]
    async fn test_subscribers_see_bumps() {
        let version = ChatListVersion::new();
        let mut rx = version.subscribe();

        version.bump();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 1);

        version.bump();
        version.bump();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), 3);
    }
}
