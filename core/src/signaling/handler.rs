//! Per-connection dispatch — decodes inbound frames, routes them against the
//! shared state, and runs disconnect cleanup exactly once on teardown.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use super::protocol::{self, ClientRequest, ServerReply};
use super::state::SignalState;
use crate::connection::ConnHandle;

/// Drive one client connection to completion: spawn its writer task, pump
/// the read loop, then clean up. Transport errors end the loop for this
/// connection only; they are never fatal to the process.
pub async fn run_connection(
    state: Arc<SignalState>,
    ws: WebSocketStream<TcpStream>,
    addr: SocketAddr,
) {
    let (mut sink, mut stream) = ws.split();
    let (conn, mut outbound) = ConnHandle::new();
    info!("Client connected from {} (conn {})", addr, conn.id());

    // Writer task: drains the outbound queue into the socket. Ends when the
    // last handle clone is dropped or the sink errors out.
    let writer = tokio::spawn(async move {
        while let Some(frame) = outbound.recv().await {
            if sink.send(frame).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = stream.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(err) => {
                warn!("Transport error on conn {}: {}", conn.id(), err);
                break;
            }
        };
        match frame {
            Message::Binary(payload) => handle_binary(&state, &conn, payload).await,
            Message::Text(text) => handle_text(&state, &conn, text).await,
            Message::Close(_) => break,
            // Pings are answered by the protocol layer on the next flush.
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
        }
    }

    cleanup(&state, &conn).await;

    // Dropping the last handle closes the outbound queue and stops the
    // writer; cleanup above already removed the clones held in shared state.
    drop(conn);
    let _ = writer.await;
    debug!("Connection from {} fully shut down", addr);
}

/// Binary frames are opaque relay payloads: forwarded verbatim when paired,
/// logged and dropped otherwise. The binary channel has no response
/// semantics, so no error reply is sent.
async fn handle_binary(state: &SignalState, conn: &ConnHandle, payload: Vec<u8>) {
    match state.peer_of(conn.id()) {
        Some(peer) => {
            debug!(
                "Relaying {} bytes from conn {} to conn {}",
                payload.len(),
                conn.id(),
                peer.id()
            );
            if peer.send_binary(payload).await.is_err() {
                warn!("Peer conn {} is gone; dropped relayed binary frame", peer.id());
            }
        }
        None => {
            warn!(
                "Binary frame from conn {} outside a relay session; dropped",
                conn.id()
            );
        }
    }
}

async fn handle_text(state: &SignalState, conn: &ConnHandle, text: String) {
    let request = match protocol::decode_request(&text) {
        Ok(Some(request)) => request,
        Ok(None) => return forward_or_reject(state, conn, text).await,
        Err(err) => {
            warn!("Undecodable text frame from conn {}: {}", conn.id(), err);
            let reply = ServerReply::Error {
                error: err.to_string(),
            };
            send_reply(conn, &reply).await;
            return;
        }
    };

    match request {
        ClientRequest::Register {
            username,
            endpoints,
            password,
        } => match state.register(conn, username, endpoints, password) {
            Ok(username) => {
                info!(
                    "Registered '{}' on conn {} ({} online)",
                    username,
                    conn.id(),
                    state.peer_count()
                );
                send_reply(conn, &ServerReply::registered()).await;
            }
            Err(err) => {
                warn!("Registration failed on conn {}: {}", conn.id(), err);
                let reply = ServerReply::RegistrationFail {
                    error: err.to_string(),
                };
                send_reply(conn, &reply).await;
            }
        },

        ClientRequest::RequestPeerList => {
            let users = state.peer_list();
            debug!("Sending peer list ({} users) to conn {}", users.len(), conn.id());
            send_reply(conn, &ServerReply::PeerList { users }).await;
        }

        ClientRequest::PeerInformation { target } => {
            let target = target.unwrap_or_default();
            match state.peer_info(&target) {
                Some(descriptor) => {
                    let reply = ServerReply::PeerInfo {
                        username: descriptor.username,
                        endpoints: descriptor.endpoints,
                    };
                    send_reply(conn, &reply).await;
                }
                None => {
                    let reply = ServerReply::PeerInfoFail {
                        error: format!("Target user '{}' not found", target),
                    };
                    send_reply(conn, &reply).await;
                }
            }
        }

        ClientRequest::InitiateRelay { target } => {
            match state.initiate_relay(conn, target.as_deref()) {
                Ok(pair) => {
                    info!("Relay started between '{}' and '{}'", pair.initiator, pair.target);
                    send_reply(conn, &ServerReply::relay_initiated(&pair.target, &pair.initiator))
                        .await;
                    let notice = ServerReply::relay_initiated(&pair.initiator, &pair.initiator);
                    send_reply(&pair.target_conn, &notice).await;
                }
                Err(err) => {
                    warn!("Relay initiation refused for conn {}: {}", conn.id(), err);
                    let reply = ServerReply::RelayFail {
                        error: err.to_string(),
                    };
                    send_reply(conn, &reply).await;
                }
            }
        }

        ClientRequest::RelayControl { action } if action.as_deref() == Some("end") => {
            match state.end_relay(conn.id()) {
                Some(peer) => {
                    let name = state
                        .username_of(conn.id())
                        .unwrap_or_else(|| "unknown".to_string());
                    info!("Relay session ended by '{}'", name);
                    let notice =
                        ServerReply::relay_ended(format!("Peer {} ended the session.", name));
                    send_reply(&peer, &notice).await;
                    send_reply(conn, &ServerReply::end_ack()).await;
                }
                None => {
                    let reply = ServerReply::RelayControlFail {
                        error: "Not currently in a relay session".to_string(),
                    };
                    send_reply(conn, &reply).await;
                }
            }
        }

        // A relay_control with any other action is not a command of ours.
        ClientRequest::RelayControl { .. } => forward_or_reject(state, conn, text).await,
    }
}

/// Well-formed JSON that is not a command: forwarded verbatim inside a relay
/// session (the text channel is opaque there too), rejected otherwise.
async fn forward_or_reject(state: &SignalState, conn: &ConnHandle, text: String) {
    match state.peer_of(conn.id()) {
        Some(peer) => {
            debug!("Relaying text frame from conn {} to conn {}", conn.id(), peer.id());
            if peer.send_text(text).await.is_err() {
                warn!("Peer conn {} is gone; dropped relayed text frame", peer.id());
            }
        }
        None => {
            let reply = ServerReply::Error {
                error: "Unknown or invalid request type".to_string(),
            };
            send_reply(conn, &reply).await;
        }
    }
}

/// Serialize and queue a reply. A failed send means the receiving
/// connection is tearing down; its own read loop handles the cleanup.
async fn send_reply(conn: &ConnHandle, reply: &ServerReply) {
    if let Ok(json) = serde_json::to_string(reply) {
        if conn.send_text(json).await.is_err() {
            debug!(
                "Outbound queue for conn {} closed; dropped {}",
                conn.id(),
                reply.message_type()
            );
        }
    }
}

/// Disconnect cleanup. Runs exactly once per connection, after the read
/// loop ends for any reason. Registry and session entries are removed in one
/// atomic step; notifying the former relay peer is best-effort with no
/// retries — a peer that is already gone discovers the broken session on its
/// own next send or read.
async fn cleanup(state: &SignalState, conn: &ConnHandle) {
    let disconnected = state.disconnect(conn.id());
    match &disconnected.username {
        Some(username) => info!(
            "Client disconnected: {} ({} still online)",
            username,
            state.peer_count()
        ),
        None => info!("Unregistered client disconnected (conn {})", conn.id()),
    }

    if let Some(peer) = disconnected.former_peer {
        let name = disconnected.username.unwrap_or_else(|| "unknown".to_string());
        info!("Relay session ended: '{}' disconnected mid-session", name);
        let notice = ServerReply::relay_ended(format!("Peer {} disconnected", name));
        send_reply(&peer, &notice).await;
    }
}
