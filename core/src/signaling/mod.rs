//! Rendezvous signaling — peer registry, relay sessions, dispatch, transport.
//!
//! One task per connection; all shared state lives in a single
//! [`SignalState`] owner so registry and session mutations stay atomic.

pub mod handler;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod state;

pub use protocol::{ClientRequest, Endpoints, RelayAction, ServerReply};
pub use registry::{PeerDescriptor, PeerRegistry, RegistryError};
pub use server::SignalServer;
pub use session::SessionTable;
pub use state::{RelayInitError, SignalState};
