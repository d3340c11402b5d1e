//! Connection registry for the signal server
//!
//! Maps each live connection to its send capability: the channel the
//! connection's writer task drains into the WebSocket sink. Delivery is
//! best-effort; sending to an unknown or closed connection is a no-op.

use dashmap::DashMap;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use slipstream_core::ConnectionId;

use crate::messages::ServerEvent;

/// Registry of live connections and their outbound channels
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, UnboundedSender<ServerEvent>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Record a newly attached connection
    pub fn register(&self, conn_id: ConnectionId, tx: UnboundedSender<ServerEvent>) {
        self.connections.insert(conn_id, tx);
    }

    /// Remove a connection; idempotent
    pub fn unregister(&self, conn_id: &str) {
        self.connections.remove(conn_id);
    }

    /// Best-effort delivery to a specific connection
    ///
    /// An absent connection or a closed channel is silently dropped;
    /// signaling failures here never surface to the caller.
    pub fn send(&self, conn_id: &str, event: ServerEvent) {
        match self.connections.get(conn_id) {
            Some(tx) => {
                if tx.send(event).is_err() {
                    debug!("Dropped event for closing connection {}", conn_id);
                }
            }
            None => debug!("Dropped event for unknown connection {}", conn_id),
        }
    }

    /// Whether the connection is currently registered
    pub fn is_registered(&self, conn_id: &str) -> bool {
        self.connections.contains_key(conn_id)
    }

    /// Number of live connections (for monitoring)
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}
