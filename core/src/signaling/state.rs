//! Shared signaling state — single owner of registry and session table.
//!
//! Registry and session mutations must be atomic with respect to each other:
//! a target-busy check followed by pairing cannot be allowed to interleave
//! with another initiation targeting the same peer. One mutex therefore
//! guards both structures together. Methods take the lock once, mutate, and
//! return plain data; callers do all their sends after the guard is gone.

use parking_lot::Mutex;
use thiserror::Error;

use super::protocol::Endpoints;
use super::registry::{PeerDescriptor, PeerRegistry, RegistryError};
use super::session::SessionTable;
use crate::connection::{ConnHandle, ConnId};

/// Why an `initiate_relay` was refused. Preconditions are checked in this
/// order; the first failure wins.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RelayInitError {
    #[error("You must be registered to initiate relay")]
    Unregistered,
    #[error("You are already in a relay session")]
    AlreadyPaired,
    #[error("Target user '{0}' not found or invalid")]
    TargetNotFound(String),
    #[error("Cannot initiate relay with yourself")]
    SelfRelay,
    #[error("Target user '{0}' is already in a relay session")]
    TargetBusy(String),
}

/// Outcome of a successful relay initiation.
#[derive(Debug, PartialEq)]
pub struct RelayPair {
    pub initiator: String,
    pub target: String,
    pub target_conn: ConnHandle,
}

/// What a disconnect tore down.
#[derive(Debug)]
pub struct Disconnected {
    pub username: Option<String>,
    pub former_peer: Option<ConnHandle>,
}

#[derive(Debug, Default)]
struct Shared {
    registry: PeerRegistry,
    sessions: SessionTable,
}

/// Single source of truth for who is online and who is relaying to whom.
#[derive(Debug, Default)]
pub struct SignalState {
    shared: Mutex<Shared>,
}

impl SignalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a username for `conn`. See [`PeerRegistry::register`].
    pub fn register(
        &self,
        conn: &ConnHandle,
        username: Option<String>,
        endpoints: Endpoints,
        password: Option<String>,
    ) -> Result<String, RegistryError> {
        self.shared
            .lock()
            .registry
            .register(username, endpoints, password, conn.clone())
    }

    /// All registered usernames.
    pub fn peer_list(&self) -> Vec<String> {
        self.shared.lock().registry.list_usernames()
    }

    /// Descriptor advertised by `target`, if registered.
    pub fn peer_info(&self, target: &str) -> Option<PeerDescriptor> {
        self.shared
            .lock()
            .registry
            .lookup(target)
            .map(|peer| peer.descriptor.clone())
    }

    /// Username registered on `conn`, if any.
    pub fn username_of(&self, conn: ConnId) -> Option<String> {
        self.shared
            .lock()
            .registry
            .username_of(conn)
            .map(str::to_owned)
    }

    /// Number of registered peers, for logs.
    pub fn peer_count(&self) -> usize {
        self.shared.lock().registry.len()
    }

    /// Start a relay session between `conn` and `target`. Preconditions in
    /// order, first failure wins: the initiator must be registered and
    /// unpaired; the target must exist, differ from the initiator, and be
    /// unpaired itself. On success both directions are inserted atomically.
    pub fn initiate_relay(
        &self,
        conn: &ConnHandle,
        target: Option<&str>,
    ) -> Result<RelayPair, RelayInitError> {
        let mut shared = self.shared.lock();

        let initiator = shared
            .registry
            .username_of(conn.id())
            .map(str::to_owned)
            .ok_or(RelayInitError::Unregistered)?;
        if shared.sessions.is_paired(conn.id()) {
            return Err(RelayInitError::AlreadyPaired);
        }
        let target = target.unwrap_or_default();
        let target_conn = match shared.registry.lookup(target) {
            Some(peer) => peer.conn.clone(),
            None => return Err(RelayInitError::TargetNotFound(target.to_owned())),
        };
        if target == initiator {
            return Err(RelayInitError::SelfRelay);
        }
        if shared.sessions.is_paired(target_conn.id()) {
            return Err(RelayInitError::TargetBusy(target.to_owned()));
        }

        shared.sessions.pair(conn.clone(), target_conn.clone());
        Ok(RelayPair {
            initiator,
            target: target.to_owned(),
            target_conn,
        })
    }

    /// Tear down `conn`'s session if present, returning the former peer's
    /// handle so the caller can notify it. Idempotent.
    pub fn end_relay(&self, conn: ConnId) -> Option<ConnHandle> {
        self.shared.lock().sessions.unpair(conn)
    }

    /// Handle of the connection paired with `conn`, if any. Pairing is
    /// validated once at initiation; relayed frames only need this lookup.
    pub fn peer_of(&self, conn: ConnId) -> Option<ConnHandle> {
        self.shared.lock().sessions.peer_of(conn)
    }

    /// Disconnect cleanup: drop the registry entry and tear down any session
    /// in one atomic step. Idempotent.
    pub fn disconnect(&self, conn: ConnId) -> Disconnected {
        let mut shared = self.shared.lock();
        let username = shared.registry.remove_by_conn(conn);
        let former_peer = shared.sessions.unpair(conn);
        Disconnected {
            username,
            former_peer,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
