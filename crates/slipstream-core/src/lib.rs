//! Slipstream Core - Shared types, configuration, and error definitions
//!
//! This crate contains the foundational types used across all Slipstream
//! components. It has no dependencies on networking code.

pub mod config;
pub mod error;
pub mod id;
pub mod types;

pub use config::{Config, ConfigError, IceConfig, IceServer, SignalConfig};
pub use error::SessionError;
pub use id::{generate_connection_id, generate_session_id, validate_session_id};
pub use types::{ConnectionId, PeerRole, SessionId};

/// Default WebSocket port
pub const DEFAULT_PORT: u16 = 8080;

/// Maximum session idle time before the sweep removes it (5 minutes)
pub const SESSION_IDLE_TIMEOUT_SECS: u64 = 300;

/// Interval between idle-session sweeps
pub const SWEEP_INTERVAL_SECS: u64 = 60;

/// Default per-session transfer size hint (1 GiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024 * 1024;
