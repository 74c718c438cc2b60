//! Peer registry — who is online and how to reach them.

use std::collections::HashMap;

use thiserror::Error;

use super::protocol::Endpoints;
use crate::connection::{ConnHandle, ConnId};

/// One registered user, as advertised at registration time.
#[derive(Debug, Clone)]
pub struct PeerDescriptor {
    pub username: String,
    /// Reachability hints, echoed back on `peer_information` requests.
    pub endpoints: Endpoints,
    /// Accepted at registration, never verified.
    pub password: Option<String>,
}

/// Registry entry: descriptor plus the owning connection's handle.
#[derive(Debug, Clone)]
pub struct RegisteredPeer {
    pub descriptor: PeerDescriptor,
    pub conn: ConnHandle,
}

/// Registration error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Username missing in registration request")]
    MissingUsername,
    #[error("Username already taken")]
    DuplicateUsername,
}

/// Username-keyed map of online peers, with a reverse index so disconnect
/// cleanup resolves connection → username in O(1) instead of scanning.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<String, RegisteredPeer>,
    by_conn: HashMap<ConnId, String>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `username` for `conn`. Fails on an absent or empty username,
    /// or one that is already taken. A connection that re-registers under a
    /// new name replaces its previous entry, keeping the reverse index
    /// single-valued.
    pub fn register(
        &mut self,
        username: Option<String>,
        endpoints: Endpoints,
        password: Option<String>,
        conn: ConnHandle,
    ) -> Result<String, RegistryError> {
        let username = username
            .filter(|u| !u.is_empty())
            .ok_or(RegistryError::MissingUsername)?;
        if self.peers.contains_key(&username) {
            return Err(RegistryError::DuplicateUsername);
        }

        if let Some(previous) = self.by_conn.insert(conn.id(), username.clone()) {
            self.peers.remove(&previous);
        }
        let descriptor = PeerDescriptor {
            username: username.clone(),
            endpoints,
            password,
        };
        self.peers
            .insert(username.clone(), RegisteredPeer { descriptor, conn });
        Ok(username)
    }

    /// Look up a peer by username.
    pub fn lookup(&self, username: &str) -> Option<&RegisteredPeer> {
        self.peers.get(username)
    }

    /// Username registered on `conn`, if any.
    pub fn username_of(&self, conn: ConnId) -> Option<&str> {
        self.by_conn.get(&conn).map(String::as_str)
    }

    /// All registered usernames. Order is not significant to clients.
    pub fn list_usernames(&self) -> Vec<String> {
        self.peers.keys().cloned().collect()
    }

    /// Remove a peer by username. Idempotent: removing an absent entry is a
    /// no-op.
    pub fn remove(&mut self, username: &str) -> Option<RegisteredPeer> {
        let peer = self.peers.remove(username)?;
        self.by_conn.remove(&peer.conn.id());
        Some(peer)
    }

    /// Remove whatever username `conn` registered. Idempotent.
    pub fn remove_by_conn(&mut self, conn: ConnId) -> Option<String> {
        let username = self.by_conn.remove(&conn)?;
        self.peers.remove(&username);
        Some(username)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================
