//! Connection abstraction — a message-oriented channel to one peer.
//!
//! Each live WebSocket gets a [`ConnHandle`]: a process-wide unique id plus
//! the sending side of a bounded outbound frame queue. A dedicated writer
//! task drains the queue into the socket, so any task holding a clone of the
//! handle can forward frames to the connection without touching the sink.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Process-wide unique connection identifier.
pub type ConnId = u64;

/// Outbound frames queued per connection before hitting the socket. A full
/// queue suspends whoever is forwarding to this connection, so a slow
/// consumer backpressures its producer instead of growing an unbounded
/// buffer.
pub const OUTBOUND_QUEUE_DEPTH: usize = 64;

static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);

/// The connection's writer task has exited; the frame was not delivered.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Connection closed")]
pub struct ConnClosed;

/// Handle to one live connection. Clones of the handle are stored in the
/// peer registry and session table; the receiver half stays with the
/// connection's writer task.
#[derive(Debug, Clone)]
pub struct ConnHandle {
    id: ConnId,
    tx: mpsc::Sender<Message>,
}

/// Two handles are equal when they carry the same process-wide unique id;
/// the outbound channel is ignored.
impl PartialEq for ConnHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ConnHandle {}

impl ConnHandle {
    /// Create a handle with a fresh id. The returned receiver feeds the
    /// connection's writer task.
    pub fn new() -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);
        let id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Queue a frame for this connection. Suspends while the queue is full.
    pub async fn send(&self, frame: Message) -> Result<(), ConnClosed> {
        self.tx.send(frame).await.map_err(|_| ConnClosed)
    }

    /// Queue a text frame.
    pub async fn send_text(&self, text: String) -> Result<(), ConnClosed> {
        self.send(Message::Text(text)).await
    }

    /// Queue a binary frame.
    pub async fn send_binary(&self, data: Vec<u8>) -> Result<(), ConnClosed> {
        self.send(Message::Binary(data)).await
    }
}
