//! Relay session table — symmetric pairing of connections.

use std::collections::HashMap;

use crate::connection::{ConnHandle, ConnId};

/// Active relay pairings. For every entry `a → handle(b)` the reverse entry
/// `b → handle(a)` is present; both directions are inserted and removed
/// together, and a connection appears as a key at most once.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<ConnId, ConnHandle>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `conn` is currently in a relay session.
    pub fn is_paired(&self, conn: ConnId) -> bool {
        self.sessions.contains_key(&conn)
    }

    /// Handle of the connection paired with `conn`, if any.
    pub fn peer_of(&self, conn: ConnId) -> Option<ConnHandle> {
        self.sessions.get(&conn).cloned()
    }

    /// Insert both directions of a pairing. Callers must have checked
    /// exclusivity; pairing an already-paired connection would corrupt the
    /// symmetry invariant.
    pub fn pair(&mut self, a: ConnHandle, b: ConnHandle) {
        debug_assert!(!self.sessions.contains_key(&a.id()));
        debug_assert!(!self.sessions.contains_key(&b.id()));
        self.sessions.insert(a.id(), b.clone());
        self.sessions.insert(b.id(), a);
    }

    /// Remove both directions of `conn`'s pairing and return the former
    /// peer. Idempotent: unpairing an unpaired connection returns `None`.
    pub fn unpair(&mut self, conn: ConnId) -> Option<ConnHandle> {
        let peer = self.sessions.remove(&conn)?;
        self.sessions.remove(&peer.id());
        Some(peer)
    }

    /// Number of session table entries (two per active pairing).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
