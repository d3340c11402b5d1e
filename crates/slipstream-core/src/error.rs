//! Error types for the signaling protocol

use thiserror::Error;

use crate::types::SessionId;

/// Failures of session-store and relay operations.
///
/// Every variant maps to a structured wire error; none of them
/// terminates the offending connection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} already exists")]
    AlreadyExists(SessionId),

    #[error("session {0} not found")]
    NotFound(SessionId),

    #[error("session {0} already has a receiver")]
    ReceiverAlreadySet(SessionId),

    #[error("session {0} has no peer to relay to")]
    NoTargetPeer(SessionId),
}
