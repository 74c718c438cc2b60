//! Directory server — the secondary request/response registry transport.
//!
//! One JSON request per connection, at most one JSON reply, then close.
//! Records are keyed by an incrementing id; there is no uniqueness check, no
//! session concept, and no persistent connection.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

/// Largest request a directory client may send.
const BUFFER_SIZE: usize = 8192;

#[derive(Debug, Default)]
struct Records {
    next_id: u64,
    entries: HashMap<u64, Value>,
}

/// Stored registrations, keyed by arrival order.
#[derive(Debug, Default)]
pub struct DirectoryState {
    records: Mutex<Records>,
}

impl DirectoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle one decoded request. The reply, if any, is written back to the
    /// client verbatim and the connection closed either way.
    pub fn handle_request(&self, message: &Value) -> Option<String> {
        match message.get("type").and_then(Value::as_str) {
            Some("register") => {
                let Some(username) = message.get("username").and_then(Value::as_str) else {
                    warn!("Directory registration missing username");
                    return None;
                };
                let mut records = self.records.lock();
                let id = records.next_id;
                records.next_id += 1;
                records.entries.insert(id, message.clone());
                info!("Directory registered user id {}: {}", id, username);
                None
            }
            Some("get_users") => {
                let records = self.records.lock();
                debug!("Directory returning {} records", records.entries.len());
                serde_json::to_string(&records.entries)
                    .ok()
                    .map(|json| json + "\n")
            }
            Some("command") => {
                match message.get("cmd").and_then(Value::as_str) {
                    Some(cmd) => info!("Directory received command: {}", cmd),
                    None => warn!("Directory command message missing 'cmd'"),
                }
                None
            }
            other => {
                warn!("Directory received unknown message type: {:?}", other);
                None
            }
        }
    }

    /// Number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.lock().entries.len()
    }
}

/// The directory server: plain TCP, stateless request/response.
pub struct DirectoryServer {
    listener: TcpListener,
    state: Arc<DirectoryState>,
}

impl DirectoryServer {
    /// Bind the directory listener. Pass port 0 for an ephemeral port.
    pub async fn bind(addr: &str) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            state: Arc::new(DirectoryState::new()),
        })
    }

    /// Address the listener actually bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared state handle, for inspection.
    pub fn state(&self) -> Arc<DirectoryState> {
        Arc::clone(&self.state)
    }

    /// Accept connections forever. A failed client only affects itself.
    pub async fn run(self) -> io::Result<()> {
        info!(
            "Directory server running on {}",
            self.listener.local_addr()?
        );
        loop {
            let (stream, addr) = self.listener.accept().await?;
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                if let Err(err) = serve_client(state, stream, addr).await {
                    warn!("Directory connection with {} failed: {}", addr, err);
                }
            });
        }
    }
}

/// Read one request, reply if the handler produced one, close.
async fn serve_client(
    state: Arc<DirectoryState>,
    mut stream: TcpStream,
    addr: SocketAddr,
) -> io::Result<()> {
    let mut buf = vec![0u8; BUFFER_SIZE];
    let n = stream.read(&mut buf).await?;
    if n == 0 {
        debug!("Directory client {} sent no data", addr);
        return Ok(());
    }

    match serde_json::from_slice::<Value>(&buf[..n]) {
        Ok(message) => {
            if let Some(reply) = state.handle_request(&message) {
                stream.write_all(reply.as_bytes()).await?;
            }
        }
        Err(err) => warn!("Invalid JSON from directory client {}: {}", addr, err),
    }

    stream.shutdown().await?;
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
