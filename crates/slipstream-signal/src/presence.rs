//! Presence tracking by external identity
//!
//! An identity (e.g. an email supplied at connect time) may map to
//! several live connections at once: multiple tabs or devices. Entries
//! are pruned as soon as their last connection detaches.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use slipstream_core::ConnectionId;

/// Tracks which connections are currently attached under each identity
#[derive(Default)]
pub struct PresenceTracker {
    identities: Mutex<HashMap<String, HashSet<ConnectionId>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self {
            identities: Mutex::new(HashMap::new()),
        }
    }

    /// Add a connection to an identity's set, creating the set if absent
    pub fn attach(&self, identity: &str, conn_id: ConnectionId) {
        let mut identities = self.identities.lock();
        identities.entry(identity.to_owned()).or_default().insert(conn_id);
    }

    /// Remove a connection from every identity it belongs to
    ///
    /// Identities whose set becomes empty are removed entirely.
    pub fn detach(&self, conn_id: &str) {
        let mut identities = self.identities.lock();
        identities.retain(|_, conns| {
            conns.remove(conn_id);
            !conns.is_empty()
        });
    }

    /// Snapshot of the connections attached under an identity
    pub fn connections(&self, identity: &str) -> Option<HashSet<ConnectionId>> {
        self.identities.lock().get(identity).cloned()
    }

    /// Number of identities with at least one live connection
    pub fn identity_count(&self) -> usize {
        self.identities.lock().len()
    }
}
