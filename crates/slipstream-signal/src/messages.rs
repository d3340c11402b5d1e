//! Signal protocol messages
//!
//! Every inbound event yields exactly one reply to the caller; relayed
//! payloads and lifecycle notices go to the other peer as separate
//! messages. Handshake payloads (`signal`, `candidate`) are opaque JSON
//! forwarded verbatim.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use slipstream_core::{PeerRole, SessionError, SessionId};

/// Messages received from clients over the signaling WebSocket
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Create a new session as sender
    CreateSession {
        /// Optional client-chosen session id
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
    },

    /// Join an existing session as receiver
    JoinSession { session_id: SessionId },

    /// Relay a session description (offer/answer) to the other peer
    RelaySignal { session_id: SessionId, signal: Value },

    /// Relay an ICE candidate to the other peer
    SendIceCandidate { session_id: SessionId, candidate: Value },

    /// Ping for keepalive
    Ping { timestamp: u64 },
}

/// Messages sent to clients over the signaling WebSocket
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Session created successfully
    SessionCreated { session_id: SessionId },

    /// Joined a session successfully
    SessionJoined { session_id: SessionId },

    /// Acknowledges a relay request back to its caller
    RelayAck { session_id: SessionId },

    /// A receiver joined the caller's session (sent to the sender)
    ReceiverJoined { session_id: SessionId },

    /// Relayed session description from the other peer
    Signal {
        session_id: SessionId,
        signal: Value,
        from: PeerRole,
    },

    /// Relayed ICE candidate from the other peer
    IceCandidate {
        session_id: SessionId,
        candidate: Value,
        from: PeerRole,
    },

    /// The other party of a session lost its connection
    PeerDisconnected { session_id: SessionId },

    /// Error response
    Error { code: ErrorCode, message: String },

    /// Pong response
    Pong { timestamp: u64 },
}

/// Error codes
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Session id already in use
    SessionExists,

    /// Unknown session id
    SessionNotFound,

    /// Session already has a receiver
    ReceiverAlreadySet,

    /// No peer on the other side of the session yet
    NoTargetPeer,

    /// Message could not be parsed
    InvalidMessage,
}

impl ServerEvent {
    /// Create an error message
    pub fn error(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl ClientEvent {
    /// Parse from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<SessionError> for ServerEvent {
    fn from(e: SessionError) -> Self {
        let code = match e {
            SessionError::AlreadyExists(_) => ErrorCode::SessionExists,
            SessionError::NotFound(_) => ErrorCode::SessionNotFound,
            SessionError::ReceiverAlreadySet(_) => ErrorCode::ReceiverAlreadySet,
            SessionError::NoTargetPeer(_) => ErrorCode::NoTargetPeer,
        };
        ServerEvent::error(code, e.to_string())
    }
}
