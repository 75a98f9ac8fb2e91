//! Session identity: who backend calls are scoped to.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::core::errors::ClientResult;
use crate::core::ids::UserId;
use crate::session::guest_store::GuestIdStore;

/// Identity every backend call is scoped to.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize)]
#[serde(tag = "kind", content = "user_id", rename_all = "snake_case")]
pub enum SessionIdentity {
    /// Signed-in account.
    Authenticated(UserId),
    /// Anonymous user; `None` until the backend allocates a guest id.
    Guest(Option<UserId>),
}

impl SessionIdentity {
    /// User id to send, if one is known.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated(id) | Self::Guest(Some(id)) => Some(id),
            Self::Guest(None) => None,
        }
    }

    /// Whether this is a signed-in account.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authenticated(id) => write!(f, "account {id}"),
            Self::Guest(Some(id)) => write!(f, "guest {id}"),
            Self::Guest(None) => f.write_str("guest (no id yet)"),
        }
    }
}

#[derive(Debug, Default)]
struct IdentityState {
    account: Option<UserId>,
    guest: Option<UserId>,
}

/// Resolves the current identity and persists guest ids.
///
/// The guest id is read from storage once at construction; afterwards the
/// provider serves it from memory and writes through on change.
pub struct IdentityProvider {
    store: Arc<dyn GuestIdStore>,
    state: RwLock<IdentityState>,
}

impl IdentityProvider {
    /// Load the persisted guest id from `store`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub fn new(store: Arc<dyn GuestIdStore>) -> ClientResult<Self> {
        let guest = store.load()?;
        debug!(has_guest = guest.is_some(), "identity provider initialised");
        Ok(Self {
            store,
            state: RwLock::new(IdentityState {
                guest,
                ..IdentityState::default()
            }),
        })
    }

    /// Current identity: the account if signed in, else the stored guest id,
    /// else a guest with no id yet.
    #[must_use]
    pub fn resolve_identity(&self) -> SessionIdentity {
        let state = self.state.read();
        state.account.as_ref().map_or_else(
            || SessionIdentity::Guest(state.guest.clone()),
            |account| SessionIdentity::Authenticated(account.clone()),
        )
    }

    /// Record the user id the backend returned from a chat start.
    ///
    /// Ignored while signed in; otherwise the id is persisted as the guest id.
    ///
    /// # Errors
    /// Returns an error if the id cannot be persisted.
    pub fn remember_guest(&self, user_id: &UserId) -> ClientResult<()> {
        let mut state = self.state.write();
        if state.account.is_some() || state.guest.as_ref() == Some(user_id) {
            return Ok(());
        }
        self.store.save(user_id)?;
        info!(guest_id = %user_id, "guest id persisted");
        state.guest = Some(user_id.clone());
        Ok(())
    }

    /// Switch to a signed-in account; the guest id is forgotten.
    ///
    /// # Errors
    /// Returns an error if the stored guest id cannot be cleared.
    pub fn login(&self, account: UserId) -> ClientResult<()> {
        let mut state = self.state.write();
        if state.guest.is_some() {
            self.store.clear()?;
            state.guest = None;
        }
        info!(user_id = %account, "signed in");
        state.account = Some(account);
        Ok(())
    }

    /// Leave the signed-in account and return to guest mode.
    pub fn logout(&self) {
        let mut state = self.state.write();
        if state.account.take().is_some() {
            info!("signed out");
        }
    }

    /// Drop the persisted guest id.
    ///
    /// # Errors
    /// Returns an error if the store cannot be cleared.
    pub fn forget_guest(&self) -> ClientResult<()> {
        let mut state = self.state.write();
        self.store.clear()?;
        state.guest = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::guest_store::MemoryGuestIdStore;

    fn provider_with(store: &Arc<MemoryGuestIdStore>) -> IdentityProvider {
        let store: Arc<dyn GuestIdStore> = store.clone();
        IdentityProvider::new(store).unwrap()
    }

    #[test]
    fn test_resolution_order() {
        let store = Arc::new(MemoryGuestIdStore::new());
        let provider = provider_with(&store);
        assert_eq!(provider.resolve_identity(), SessionIdentity::Guest(None));

        provider.remember_guest(&UserId::new("g1")).unwrap();
        assert_eq!(
            provider.resolve_identity(),
            SessionIdentity::Guest(Some(UserId::new("g1")))
        );
        assert_eq!(store.load().unwrap(), Some(UserId::new("g1")));

        provider.login(UserId::new("acct")).unwrap();
        assert_eq!(
            provider.resolve_identity(),
            SessionIdentity::Authenticated(UserId::new("acct"))
        );
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_persisted_guest_is_reused() {
        let store = Arc::new(MemoryGuestIdStore::with_guest(UserId::new("g7")));
        let provider = provider_with(&store);
        assert_eq!(
            provider.resolve_identity().user_id(),
            Some(&UserId::new("g7"))
        );
    }

    #[test]
    fn test_remember_guest_ignored_when_signed_in() {
        let store = Arc::new(MemoryGuestIdStore::new());
        let provider = provider_with(&store);
        provider.login(UserId::new("acct")).unwrap();

        provider.remember_guest(&UserId::new("g1")).unwrap();

        assert!(provider.resolve_identity().is_authenticated());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_identity_transitions() {
        let store = Arc::new(MemoryGuestIdStore::new());
        let provider = provider_with(&store);

        provider.remember_guest(&UserId::new("g1")).unwrap();
        provider.remember_guest(&UserId::new("g1")).unwrap();
        assert_eq!(
            provider.resolve_identity(),
            SessionIdentity::Guest(Some(UserId::new("g1")))
        );

        provider.login(UserId::new("acct")).unwrap();
        assert_eq!(
            provider.resolve_identity(),
            SessionIdentity::Authenticated(UserId::new("acct"))
        );
        provider.logout();
        provider.logout();
        assert_eq!(provider.resolve_identity(), SessionIdentity::Guest(None));

        provider.remember_guest(&UserId::new("g2")).unwrap();
        assert_eq!(store.load().unwrap(), Some(UserId::new("g2")));
        provider.forget_guest().unwrap();
        assert_eq!(provider.resolve_identity(), SessionIdentity::Guest(None));
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SessionIdentity::Guest(None).to_string(),
            "guest (no id yet)"
        );
        assert_eq!(
            SessionIdentity::Authenticated(UserId::new("u1")).to_string(),
            "account u1"
        );
    }
}
