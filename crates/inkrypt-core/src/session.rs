use crate::records::Address;
use crate::store::{KeyValueStore, LocalStore};

/// Who is signed in, passed explicitly to the account view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Session {
    active_address: Option<Address>,
}

impl Session {
    /// A session with nobody signed in.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A session for `address`, trimmed. Blank addresses count as signed out.
    pub fn new(address: Option<Address>) -> Self {
        Self {
            active_address: address
                .map(|a| a.as_str().trim().to_string())
                .filter(|a| !a.is_empty())
                .map(Address::from),
        }
    }

    /// Prefer `explicit`, falling back to the address recorded in `store`.
    pub fn resolve<S: KeyValueStore>(explicit: Option<Address>, store: &LocalStore<S>) -> Self {
        let session = Self::new(explicit);
        if session.is_authenticated() {
            return session;
        }
        Self::new(store.active_address())
    }

    pub fn active_address(&self) -> Option<&Address> {
        self.active_address.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.active_address.is_some()
    }
}
