//! Identifier generation for sessions and connections
//!
//! Session ids are 32 hex characters (16 random bytes); connection ids
//! are 16 hex characters (8 random bytes). Clients may also supply
//! their own session id, which is checked with `validate_session_id`.

use crate::types::{ConnectionId, SessionId};

/// Length of a generated session id in bytes (before hex encoding)
pub const SESSION_ID_BYTES: usize = 16;

/// Length of a generated connection id in bytes (before hex encoding)
pub const CONNECTION_ID_BYTES: usize = 8;

/// Longest accepted client-supplied session id
pub const MAX_SESSION_ID_LEN: usize = 64;

/// Generate a random session id
///
/// # Panics
/// Panics if the system random number generator fails (extremely rare).
/// Use `try_generate_session_id` if you need to handle this case.
pub fn generate_session_id() -> SessionId {
    try_generate_session_id().expect("RNG failed - system entropy source unavailable")
}

/// Try to generate a random session id, returning an error if RNG fails
pub fn try_generate_session_id() -> Result<SessionId, getrandom::Error> {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    getrandom::getrandom(&mut bytes)?;
    Ok(hex::encode(bytes))
}

/// Generate a random connection id
///
/// # Panics
/// Panics if the system random number generator fails (extremely rare).
pub fn generate_connection_id() -> ConnectionId {
    let mut bytes = [0u8; CONNECTION_ID_BYTES];
    getrandom::getrandom(&mut bytes).expect("RNG failed - system entropy source unavailable");
    hex::encode(bytes)
}

/// Validate a client-supplied session id
///
/// Accepts 1 to `MAX_SESSION_ID_LEN` ASCII alphanumeric characters,
/// dashes, and underscores.
pub fn validate_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
