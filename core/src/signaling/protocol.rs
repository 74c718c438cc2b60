//! Signaling wire protocol — JSON text frames tagged by `type`.
//!
//! Binary frames never reach this module; they are opaque relay payloads.
//! Text frames decode into a [`ClientRequest`], or stay undecoded when they
//! carry an unknown `type` — the dispatcher forwards those verbatim inside a
//! relay session.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Advertised reachability hints. Opaque to the server: stored and echoed
/// back verbatim, never validated beyond presence.
///
/// `pip`/`ip`/`port` is the canonical trio; the per-family `ipv4_*`/`ipv6_*`
/// fields are optional variants some clients advertise instead.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Endpoints {
    /// Public (server-reflexive) address hint
    #[serde(default)]
    pub pip: Option<Value>,
    /// Local address hint
    #[serde(default)]
    pub ip: Option<Value>,
    #[serde(default)]
    pub port: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_ip: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv4_port: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_ip: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ipv6_port: Option<Value>,
}

/// A decoded client command.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientRequest {
    Register {
        username: Option<String>,
        #[serde(flatten)]
        endpoints: Endpoints,
        /// Accepted for forward compatibility; never checked.
        password: Option<String>,
    },
    RequestPeerList,
    PeerInformation {
        target: Option<String>,
    },
    InitiateRelay {
        target: Option<String>,
    },
    RelayControl {
        action: Option<String>,
    },
}

/// Command tags this server understands. Anything else is relay traffic or
/// an invalid request, depending on session state.
const KNOWN_TYPES: &[&str] = &[
    "register",
    "request_peer_list",
    "peer_information",
    "initiate_relay",
    "relay_control",
];

/// Why a text frame could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid JSON format")]
    InvalidJson,
    #[error("Invalid fields for '{0}' request")]
    BadFields(String),
}

/// Decode a text frame. `Ok(None)` means well-formed JSON that is not a
/// known command — the caller decides between forwarding and rejecting.
pub fn decode_request(text: &str) -> Result<Option<ClientRequest>, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(|_| DecodeError::InvalidJson)?;
    let Some(tag) = value.get("type").and_then(Value::as_str) else {
        return Ok(None);
    };
    if !KNOWN_TYPES.contains(&tag) {
        return Ok(None);
    }
    let tag = tag.to_owned();
    serde_json::from_value(value)
        .map(Some)
        .map_err(|_| DecodeError::BadFields(tag))
}

/// Relay-control actions carried in `relay_control` frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayAction {
    End,
    EndAck,
}

/// A server-to-client reply. The serialized shape is the wire contract:
/// a `type` tag plus per-variant fields, errors always carrying `error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerReply {
    RegistrationAck {
        status: String,
    },
    RegistrationFail {
        error: String,
    },
    PeerList {
        users: Vec<String>,
    },
    PeerInfo {
        username: String,
        #[serde(flatten)]
        endpoints: Endpoints,
    },
    PeerInfoFail {
        error: String,
    },
    RelayInitiated {
        status: String,
        peer: String,
        initiator: String,
    },
    RelayFail {
        error: String,
    },
    RelayControl {
        action: RelayAction,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    RelayControlFail {
        error: String,
    },
    Error {
        error: String,
    },
}

impl ServerReply {
    /// Successful registration acknowledgment.
    pub fn registered() -> Self {
        Self::RegistrationAck {
            status: "registered".to_string(),
        }
    }

    /// Session-established notice, sent to both endpoints with their
    /// respective `peer`.
    pub fn relay_initiated(peer: &str, initiator: &str) -> Self {
        Self::RelayInitiated {
            status: "relay_initiated".to_string(),
            peer: peer.to_string(),
            initiator: initiator.to_string(),
        }
    }

    /// Acknowledgment for the endpoint that requested the teardown.
    pub fn end_ack() -> Self {
        Self::RelayControl {
            action: RelayAction::EndAck,
            reason: None,
        }
    }

    /// Teardown notice for the endpoint that did not request it.
    pub fn relay_ended(reason: String) -> Self {
        Self::RelayControl {
            action: RelayAction::End,
            reason: Some(reason),
        }
    }

    /// Get the wire tag of this reply, for logging.
    pub fn message_type(&self) -> &'static str {
        match self {
            ServerReply::RegistrationAck { .. } => "registration_ack",
            ServerReply::RegistrationFail { .. } => "registration_fail",
            ServerReply::PeerList { .. } => "peer_list",
            ServerReply::PeerInfo { .. } => "peer_info",
            ServerReply::PeerInfoFail { .. } => "peer_info_fail",
            ServerReply::RelayInitiated { .. } => "relay_initiated",
            ServerReply::RelayFail { .. } => "relay_fail",
            ServerReply::RelayControl { .. } => "relay_control",
            ServerReply::RelayControlFail { .. } => "relay_control_fail",
            ServerReply::Error { .. } => "error",
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_register() {
        let text = json!({
            "type": "register",
            "username": "alice",
            "pip": "1.2.3.4",
            "ip": "10.0.0.1",
            "port": 5000,
            "password": "hunter2"
        })
        .to_string();

        match decode_request(&text) {
            Ok(Some(ClientRequest::Register {
                username,
                endpoints,
                password,
            })) => {
                assert_eq!(username.as_deref(), Some("alice"));
                assert_eq!(endpoints.pip, Some(json!("1.2.3.4")));
                assert_eq!(endpoints.port, Some(json!(5000)));
                assert_eq!(password.as_deref(), Some("hunter2"));
            }
            other => panic!("Unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_register_without_username() {
        let text = json!({"type": "register", "ip": "10.0.0.1"}).to_string();
        match decode_request(&text) {
            Ok(Some(ClientRequest::Register { username, .. })) => assert!(username.is_none()),
            other => panic!("Unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_variant_endpoint_fields() {
        let text = json!({
            "type": "register",
            "username": "bob",
            "ipv4_ip": "10.0.0.2",
            "ipv4_port": 6000,
            "ipv6_ip": "::1",
            "ipv6_port": 6001
        })
        .to_string();

        match decode_request(&text) {
            Ok(Some(ClientRequest::Register { endpoints, .. })) => {
                assert_eq!(endpoints.ipv4_ip, Some(json!("10.0.0.2")));
                assert_eq!(endpoints.ipv6_port, Some(json!(6001)));
                assert!(endpoints.pip.is_none());
            }
            other => panic!("Unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_decode_unknown_type_is_not_an_error() {
        let text = json!({"type": "sdp_offer", "blob": "..."}).to_string();
        assert!(matches!(decode_request(&text), Ok(None)));
    }

    #[test]
    fn test_decode_missing_type_is_not_an_error() {
        let text = json!({"username": "alice"}).to_string();
        assert!(matches!(decode_request(&text), Ok(None)));
    }

    #[test]
    fn test_decode_invalid_json() {
        assert_eq!(decode_request("not json"), Err(DecodeError::InvalidJson));
    }

    #[test]
    fn test_decode_bad_fields() {
        // Known tag but a username that is not a string.
        let text = json!({"type": "register", "username": 42}).to_string();
        assert_eq!(
            decode_request(&text),
            Err(DecodeError::BadFields("register".to_string()))
        );
    }

    #[test]
    fn test_decode_relay_control() {
        let text = json!({"type": "relay_control", "action": "end"}).to_string();
        match decode_request(&text) {
            Ok(Some(ClientRequest::RelayControl { action })) => {
                assert_eq!(action.as_deref(), Some("end"));
            }
            other => panic!("Unexpected decode result: {:?}", other),
        }
    }

    #[test]
    fn test_registration_ack_shape() {
        let value = serde_json::to_value(ServerReply::registered()).unwrap();
        assert_eq!(value["type"], "registration_ack");
        assert_eq!(value["status"], "registered");
    }

    #[test]
    fn test_peer_list_shape() {
        let reply = ServerReply::PeerList {
            users: vec!["alice".to_string(), "bob".to_string()],
        };
        let value = serde_json::to_value(reply).unwrap();
        assert_eq!(value["type"], "peer_list");
        assert_eq!(value["users"], json!(["alice", "bob"]));
    }

    #[test]
    fn test_peer_info_always_carries_canonical_trio() {
        let reply = ServerReply::PeerInfo {
            username: "alice".to_string(),
            endpoints: Endpoints::default(),
        };
        let value = serde_json::to_value(reply).unwrap();
        assert_eq!(value["type"], "peer_info");
        assert_eq!(value["username"], "alice");
        // The canonical fields are present (as null) even when unset; the
        // per-family variants are omitted entirely.
        assert!(value.as_object().unwrap().contains_key("pip"));
        assert!(value.as_object().unwrap().contains_key("ip"));
        assert!(value.as_object().unwrap().contains_key("port"));
        assert!(!value.as_object().unwrap().contains_key("ipv4_ip"));
    }

    #[test]
    fn test_relay_initiated_shape() {
        let value = serde_json::to_value(ServerReply::relay_initiated("bob", "alice")).unwrap();
        assert_eq!(value["type"], "relay_initiated");
        assert_eq!(value["status"], "relay_initiated");
        assert_eq!(value["peer"], "bob");
        assert_eq!(value["initiator"], "alice");
    }

    #[test]
    fn test_relay_control_shapes() {
        let ack = serde_json::to_value(ServerReply::end_ack()).unwrap();
        assert_eq!(ack["type"], "relay_control");
        assert_eq!(ack["action"], "end_ack");
        assert!(!ack.as_object().unwrap().contains_key("reason"));

        let ended =
            serde_json::to_value(ServerReply::relay_ended("Peer alice disconnected".into()))
                .unwrap();
        assert_eq!(ended["action"], "end");
        assert_eq!(ended["reason"], "Peer alice disconnected");
    }

    #[test]
    fn test_error_reply_shape() {
        let reply = ServerReply::Error {
            error: "Unknown or invalid request type".to_string(),
        };
        let value = serde_json::to_value(reply).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["error"], "Unknown or invalid request type");
    }

    #[test]
    fn test_reply_round_trip() {
        let reply = ServerReply::relay_initiated("bob", "alice");
        let json = serde_json::to_string(&reply).unwrap();
        let restored: ServerReply = serde_json::from_str(&json).unwrap();
        assert_eq!(reply, restored);
    }
}
