// Meetpoint Core — Rendezvous Spine
//
// Peers that cannot reach each other directly register here, discover each
// other, and either trade addresses for a direct attempt or have the server
// relay application data between them until the session ends.

pub mod config;
pub mod connection;
pub mod directory;
pub mod signaling;

pub use config::ServerConfig;
pub use connection::{ConnHandle, ConnId};
pub use directory::{DirectoryServer, DirectoryState};
pub use signaling::{SignalServer, SignalState};
