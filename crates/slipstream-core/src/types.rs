//! Core type definitions for Slipstream
//!
//! These types are used across all crates and define the fundamental
//! identifiers of the signaling protocol.

use serde::{Deserialize, Serialize};

/// Identifies one signaling session (a sender/receiver pairing)
pub type SessionId = String;

/// Opaque identifier for one live transport connection
pub type ConnectionId = String;

/// Which side of a session a connection occupies
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerRole {
    Sender,
    Receiver,
}

impl PeerRole {
    /// The opposite role
    pub const fn other(self) -> Self {
        match self {
            PeerRole::Sender => PeerRole::Receiver,
            PeerRole::Receiver => PeerRole::Sender,
        }
    }
}

impl std::fmt::Display for PeerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeerRole::Sender => write!(f, "sender"),
            PeerRole::Receiver => write!(f, "receiver"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_other() {
        assert_eq!(PeerRole::Sender.other(), PeerRole::Receiver);
        assert_eq!(PeerRole::Receiver.other(), PeerRole::Sender);
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&PeerRole::Sender).unwrap(), "\"sender\"");
        assert_eq!(serde_json::to_string(&PeerRole::Receiver).unwrap(), "\"receiver\"");
    }
}
