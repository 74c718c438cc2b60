//! WebSocket signaling server — accepts connections and hands each one to
//! the dispatcher.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use super::handler;
use super::state::SignalState;

/// The signaling server: a TCP listener plus the shared state every
/// connection task mutates.
pub struct SignalServer {
    listener: TcpListener,
    state: Arc<SignalState>,
}

impl SignalServer {
    /// Bind the signaling listener. Pass port 0 for an ephemeral port.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            state: Arc::new(SignalState::new()),
        })
    }

    /// Address the listener actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared state handle, for inspection.
    pub fn state(&self) -> Arc<SignalState> {
        Arc::clone(&self.state)
    }

    /// Accept connections forever. A failed WebSocket handshake or a failed
    /// connection only affects that client, never the accept loop.
    pub async fn run(self) -> io::Result<()> {
        info!(
            "Signaling server running on ws://{}",
            self.listener.local_addr()?
        );
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                match tokio_tungstenite::accept_async(stream).await {
                    Ok(ws) => handler::run_connection(state, ws, addr).await,
                    Err(err) => warn!("WebSocket handshake with {} failed: {}", addr, err),
                }
            });
        }
    }
}
