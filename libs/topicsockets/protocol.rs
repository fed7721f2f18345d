//! Wire protocol for the topic channel.
//!
//! Every frame is a JSON object tagged by a `type` field. The client opens
//! the WebSocket, sends `connect` and waits for `connected` before the
//! channel is considered usable; an `error` frame at that point is a
//! handshake rejection. After the handshake, `subscribe`/`unsubscribe`
//! manage topic interest and the server delivers `message` frames carrying
//! an opaque JSON payload per topic.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol revision sent in the `connect` frame.
pub const PROTOCOL_VERSION: u8 = 1;

/// Frames sent from the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Handshake. Must be the first frame on a fresh connection.
    Connect {
        protocol: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
    },
    /// Start receiving `message` frames for a topic.
    Subscribe { topic: String },
    /// Stop receiving `message` frames for a topic.
    Unsubscribe { topic: String },
    /// Application-level liveness probe.
    Ping,
    /// Reply to a server `ping`.
    Pong,
    /// Graceful goodbye before closing the socket.
    Disconnect,
}

/// Frames sent from the server to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Handshake accepted.
    Connected {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<String>,
    },
    /// Protocol-level failure. Fatal during the handshake, advisory after.
    Error { message: String },
    /// Payload published to a topic.
    Message { topic: String, payload: Value },
    /// Server-initiated liveness probe.
    Ping,
    /// Reply to a client `ping`.
    Pong,
}

impl ClientFrame {
    pub fn connect(token: Option<String>) -> Self {
        ClientFrame::Connect {
            protocol: PROTOCOL_VERSION,
            token,
        }
    }

    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl ServerFrame {
    pub fn message(topic: impl Into<String>, payload: Value) -> Self {
        ServerFrame::Message {
            topic: topic.into(),
            payload,
        }
    }

    pub fn to_text(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_text(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn from_bytes(raw: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(raw)
    }
}
