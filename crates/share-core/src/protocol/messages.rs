//! JSON messages exchanged over the relay WebSocket.
//!
//! Messages are tagged with a `"type"` field in snake_case, for example:
//!
//! ```json
//! { "type": "join", "identifier": "3f2a-abc" }
//! { "type": "relay", "identifier": "3f2a-abc", "command": "click", "parameters": { "x": 10 } }
//! ```
//!
//! Relay payloads are opaque: `parameters` is carried as a raw
//! [`serde_json::Value`] and forwarded byte-for-byte equivalent.

use serde::{Deserialize, Serialize};

use crate::domain::session::SessionState;
use crate::error::BrokerError;

/// Wire code sent when an inbound frame cannot be decoded.
pub const MALFORMED_MESSAGE: &str = "malformed_message";

/// An opaque command forwarded from one participant to the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayPayload {
    pub command: String,
    #[serde(default)]
    pub parameters: serde_json::Value,
}

// ── Inbound ───────────────────────────────────────────────────────────────────

/// Messages sent by an endpoint to the relay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Bind this connection to `identifier`.
    Join { identifier: String },
    /// Forward a command to the other participant.
    Relay {
        identifier: String,
        command: String,
        #[serde(default)]
        parameters: serde_json::Value,
    },
    /// Tear the session down and disconnect the other participant.
    Unregister { identifier: String },
}

// ── Outbound ──────────────────────────────────────────────────────────────────

/// Messages sent by the relay to an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    JoinResult {
        identifier: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<SessionState>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    PeerConnected {
        identifier: String,
    },
    PeerDisconnected {
        identifier: String,
    },
    /// A relayed payload, unchanged from the sender's `relay` message.
    Command {
        identifier: String,
        command: String,
        #[serde(default)]
        parameters: serde_json::Value,
    },
    RelayFailed {
        identifier: String,
        error: String,
        message: String,
    },
    UnregisterResult {
        identifier: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Error {
        error: String,
        message: String,
    },
}

impl ServerMsg {
    pub fn join_ok(identifier: impl Into<String>, state: SessionState) -> Self {
        ServerMsg::JoinResult {
            identifier: identifier.into(),
            success: true,
            state: Some(state),
            error: None,
            message: None,
        }
    }

    pub fn join_failed(identifier: impl Into<String>, err: &BrokerError) -> Self {
        ServerMsg::JoinResult {
            identifier: identifier.into(),
            success: false,
            state: None,
            error: Some(err.code().to_string()),
            message: Some(err.to_string()),
        }
    }

    pub fn command(identifier: impl Into<String>, payload: RelayPayload) -> Self {
        ServerMsg::Command {
            identifier: identifier.into(),
            command: payload.command,
            parameters: payload.parameters,
        }
    }

    pub fn relay_failed(identifier: impl Into<String>, err: &BrokerError) -> Self {
        ServerMsg::RelayFailed {
            identifier: identifier.into(),
            error: err.code().to_string(),
            message: err.to_string(),
        }
    }

    pub fn unregister_ok(identifier: impl Into<String>) -> Self {
        ServerMsg::UnregisterResult {
            identifier: identifier.into(),
            success: true,
            error: None,
            message: None,
        }
    }

    pub fn unregister_failed(identifier: impl Into<String>, err: &BrokerError) -> Self {
        ServerMsg::UnregisterResult {
            identifier: identifier.into(),
            success: false,
            error: Some(err.code().to_string()),
            message: Some(err.to_string()),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        ServerMsg::Error {
            error: MALFORMED_MESSAGE.to_string(),
            message: message.into(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
