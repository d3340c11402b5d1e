//! Slipstream Signal Server
//!
//! Lightweight signaling server that brokers direct peer-to-peer data
//! channels for file transfer. Clients connect via WebSocket to exchange
//! session descriptions and ICE candidates out of band.
//!
//! # Protocol
//!
//! 1. Sender creates a session (optionally with its own id)
//! 2. Receiver joins the session using the session id
//! 3. Server relays offers/answers and ICE candidates between the two
//! 4. Peers establish a direct data channel
//! 5. The signaling connection can be dropped

pub mod messages;
pub mod presence;
pub mod registry;
pub mod relay;
pub mod server;
pub mod session;

pub use messages::{ClientEvent, ErrorCode, ServerEvent};
pub use presence::PresenceTracker;
pub use registry::ConnectionRegistry;
pub use relay::SignalRelay;
pub use server::SignalServer;
pub use session::{Session, SessionStore};
