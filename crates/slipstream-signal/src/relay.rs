//! Event handlers for the signaling protocol
//!
//! One handler per inbound event. Every request yields exactly one
//! reply to its caller; notifications to the other party of a session
//! (receiver joined, relayed payloads, peer disconnected) travel
//! separately through the connection registry and are best-effort.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use slipstream_core::{PeerRole, SessionError, SessionId};

use crate::messages::{ClientEvent, ServerEvent};
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;
use crate::session::SessionStore;

/// Routes handshake payloads between the two parties of a session
pub struct SignalRelay {
    registry: Arc<ConnectionRegistry>,
    presence: Arc<PresenceTracker>,
    sessions: Arc<SessionStore>,
}

impl SignalRelay {
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        presence: Arc<PresenceTracker>,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            registry,
            presence,
            sessions,
        }
    }

    /// Connection established: register it and attach presence
    pub fn handle_attach(
        &self,
        conn_id: &str,
        identity: Option<&str>,
        tx: tokio::sync::mpsc::UnboundedSender<ServerEvent>,
    ) {
        self.registry.register(conn_id.to_owned(), tx);
        if let Some(identity) = identity {
            self.presence.attach(identity, conn_id.to_owned());
        }
        debug!("Connection attached: {}", conn_id);
    }

    /// Connection lost: notify surviving peers, mark sessions
    ///
    /// Every session containing the connection is handled, not just the
    /// first match.
    pub fn handle_detach(&self, conn_id: &str) {
        self.registry.unregister(conn_id);
        self.presence.detach(conn_id);

        for session in self.sessions.sessions_containing(conn_id) {
            if let Some(peer) = session.peer_of(conn_id) {
                self.registry.send(
                    peer,
                    ServerEvent::PeerDisconnected {
                        session_id: session.id.clone(),
                    },
                );
            }
            self.sessions.mark_disconnected(&session.id);
        }

        debug!("Connection detached: {}", conn_id);
    }

    /// Dispatch one inbound event and produce its reply
    pub fn handle_event(&self, conn_id: &str, event: ClientEvent) -> ServerEvent {
        match event {
            ClientEvent::CreateSession { session_id } => self.create_session(conn_id, session_id),
            ClientEvent::JoinSession { session_id } => self.join_session(conn_id, session_id),
            ClientEvent::RelaySignal { session_id, signal } => {
                self.relay(conn_id, session_id, Payload::Signal(signal))
            }
            ClientEvent::SendIceCandidate { session_id, candidate } => {
                self.relay(conn_id, session_id, Payload::Candidate(candidate))
            }
            ClientEvent::Ping { timestamp } => ServerEvent::Pong { timestamp },
        }
    }

    fn create_session(&self, conn_id: &str, requested: Option<SessionId>) -> ServerEvent {
        match self.sessions.create(requested, conn_id.to_owned()) {
            Ok(session_id) => {
                info!("Session {} created by {}", session_id, conn_id);
                ServerEvent::SessionCreated { session_id }
            }
            Err(e) => e.into(),
        }
    }

    fn join_session(&self, conn_id: &str, session_id: SessionId) -> ServerEvent {
        match self.sessions.join(&session_id, conn_id.to_owned()) {
            Ok(sender) => {
                info!("Receiver {} joined session {}", conn_id, session_id);
                self.registry.send(
                    &sender,
                    ServerEvent::ReceiverJoined {
                        session_id: session_id.clone(),
                    },
                );
                ServerEvent::SessionJoined { session_id }
            }
            Err(e) => e.into(),
        }
    }

    /// Forward an opaque handshake payload to the session's other party
    fn relay(&self, conn_id: &str, session_id: SessionId, payload: Payload) -> ServerEvent {
        let session = match self.sessions.get(&session_id) {
            Some(s) => s,
            None => return SessionError::NotFound(session_id).into(),
        };

        // The caller is the sender iff it created the session
        let from = if session.sender == conn_id {
            PeerRole::Sender
        } else {
            PeerRole::Receiver
        };

        // Fails locally when the other party never joined or its
        // connection is gone; relay never waits for a target
        let target = match session.peer_of(conn_id) {
            Some(target) if self.registry.is_registered(target) => target.clone(),
            _ => return SessionError::NoTargetPeer(session_id).into(),
        };

        self.sessions.touch(&session_id);
        self.registry.send(&target, payload.tagged(session_id.clone(), from));

        ServerEvent::RelayAck { session_id }
    }

    /// Number of active sessions (for monitoring)
    pub fn session_count(&self) -> usize {
        self.sessions.session_count()
    }

    /// Number of live connections (for monitoring)
    pub fn connection_count(&self) -> usize {
        self.registry.connection_count()
    }
}

/// A handshake payload awaiting its wire tag
enum Payload {
    Signal(Value),
    Candidate(Value),
}

impl Payload {
    fn tagged(self, session_id: SessionId, from: PeerRole) -> ServerEvent {
        match self {
            Payload::Signal(signal) => ServerEvent::Signal {
                session_id,
                signal,
                from,
            },
            Payload::Candidate(candidate) => ServerEvent::IceCandidate {
                session_id,
                candidate,
                from,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::ErrorCode;
    use serde_json::json;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Harness {
        relay: SignalRelay,
        sessions: Arc<SessionStore>,
        presence: Arc<PresenceTracker>,
    }

    impl Harness {
        fn new() -> Self {
            let registry = Arc::new(ConnectionRegistry::new());
            let presence = Arc::new(PresenceTracker::new());
            let sessions = Arc::new(SessionStore::new());
            let relay = SignalRelay::new(registry, presence.clone(), sessions.clone());
            Self {
                relay,
                sessions,
                presence,
            }
        }

        fn attach(&self, conn_id: &str, identity: Option<&str>) -> UnboundedReceiver<ServerEvent> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.relay.handle_attach(conn_id, identity, tx);
            rx
        }
    }

    fn expect_error(event: ServerEvent) -> ErrorCode {
        match event {
            ServerEvent::Error { code, .. } => code,
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[test]
    fn test_create_and_duplicate() {
        let h = Harness::new();
        let _rx = h.attach("A", None);

        let reply = h.relay.handle_event(
            "A",
            ClientEvent::CreateSession {
                session_id: Some("s".into()),
            },
        );
        assert!(matches!(reply, ServerEvent::SessionCreated { session_id } if session_id == "s"));

        let reply = h.relay.handle_event(
            "A",
            ClientEvent::CreateSession {
                session_id: Some("s".into()),
            },
        );
        assert_eq!(expect_error(reply), ErrorCode::SessionExists);
    }

    #[test]
    fn test_create_generates_id() {
        let h = Harness::new();
        let _rx = h.attach("A", None);

        let reply = h
            .relay
            .handle_event("A", ClientEvent::CreateSession { session_id: None });
        match reply {
            ServerEvent::SessionCreated { session_id } => {
                assert!(!session_id.is_empty());
                assert!(h.sessions.contains(&session_id));
            }
            other => panic!("expected session_created, got {:?}", other),
        }
    }

    #[test]
    fn test_join_notifies_sender() {
        let h = Harness::new();
        let mut rx_a = h.attach("A", None);
        let _rx_b = h.attach("B", None);

        h.relay.handle_event(
            "A",
            ClientEvent::CreateSession {
                session_id: Some("s".into()),
            },
        );

        let reply = h
            .relay
            .handle_event("B", ClientEvent::JoinSession { session_id: "s".into() });
        assert!(matches!(reply, ServerEvent::SessionJoined { session_id } if session_id == "s"));

        match rx_a.try_recv().unwrap() {
            ServerEvent::ReceiverJoined { session_id } => assert_eq!(session_id, "s"),
            other => panic!("expected receiver_joined, got {:?}", other),
        }
    }

    #[test]
    fn test_join_errors() {
        let h = Harness::new();
        let _rx_a = h.attach("A", None);
        let _rx_b = h.attach("B", None);
        let _rx_c = h.attach("C", None);

        let reply = h
            .relay
            .handle_event("B", ClientEvent::JoinSession { session_id: "nope".into() });
        assert_eq!(expect_error(reply), ErrorCode::SessionNotFound);

        h.relay.handle_event(
            "A",
            ClientEvent::CreateSession {
                session_id: Some("s".into()),
            },
        );
        h.relay
            .handle_event("B", ClientEvent::JoinSession { session_id: "s".into() });

        let reply = h
            .relay
            .handle_event("C", ClientEvent::JoinSession { session_id: "s".into() });
        assert_eq!(expect_error(reply), ErrorCode::ReceiverAlreadySet);

        assert_eq!(h.sessions.get("s").unwrap().receiver.as_deref(), Some("B"));
    }

    #[test]
    fn test_relay_before_join_fails() {
        let h = Harness::new();
        let _rx_a = h.attach("A", None);

        h.relay.handle_event(
            "A",
            ClientEvent::CreateSession {
                session_id: Some("s".into()),
            },
        );

        let reply = h.relay.handle_event(
            "A",
            ClientEvent::RelaySignal {
                session_id: "s".into(),
                signal: json!({"type": "offer"}),
            },
        );
        assert_eq!(expect_error(reply), ErrorCode::NoTargetPeer);
    }

    #[test]
    fn test_relay_unknown_session() {
        let h = Harness::new();
        let _rx_a = h.attach("A", None);

        let reply = h.relay.handle_event(
            "A",
            ClientEvent::SendIceCandidate {
                session_id: "nope".into(),
                candidate: json!({}),
            },
        );
        assert_eq!(expect_error(reply), ErrorCode::SessionNotFound);
    }

    #[test]
    fn test_relay_both_directions() {
        let h = Harness::new();
        let mut rx_a = h.attach("A", None);
        let mut rx_b = h.attach("B", None);

        h.relay.handle_event(
            "A",
            ClientEvent::CreateSession {
                session_id: Some("s".into()),
            },
        );
        h.relay
            .handle_event("B", ClientEvent::JoinSession { session_id: "s".into() });
        rx_a.try_recv().unwrap(); // drain receiver_joined

        // Sender -> receiver
        let reply = h.relay.handle_event(
            "A",
            ClientEvent::RelaySignal {
                session_id: "s".into(),
                signal: json!({"type": "offer"}),
            },
        );
        assert!(matches!(reply, ServerEvent::RelayAck { .. }));

        match rx_b.try_recv().unwrap() {
            ServerEvent::Signal {
                session_id,
                signal,
                from,
            } => {
                assert_eq!(session_id, "s");
                assert_eq!(signal["type"], "offer");
                assert_eq!(from, PeerRole::Sender);
            }
            other => panic!("expected signal, got {:?}", other),
        }

        // Receiver -> sender
        h.relay.handle_event(
            "B",
            ClientEvent::RelaySignal {
                session_id: "s".into(),
                signal: json!({"type": "answer"}),
            },
        );
        match rx_a.try_recv().unwrap() {
            ServerEvent::Signal { signal, from, .. } => {
                assert_eq!(signal["type"], "answer");
                assert_eq!(from, PeerRole::Receiver);
            }
            other => panic!("expected signal, got {:?}", other),
        }
    }

    #[test]
    fn test_ice_candidate_relay() {
        let h = Harness::new();
        let _rx_a = h.attach("A", None);
        let mut rx_b = h.attach("B", None);

        h.relay.handle_event(
            "A",
            ClientEvent::CreateSession {
                session_id: Some("s".into()),
            },
        );
        h.relay
            .handle_event("B", ClientEvent::JoinSession { session_id: "s".into() });

        let reply = h.relay.handle_event(
            "A",
            ClientEvent::SendIceCandidate {
                session_id: "s".into(),
                candidate: json!({"candidate": "candidate:0 1 UDP 2122252543 ..."}),
            },
        );
        assert!(matches!(reply, ServerEvent::RelayAck { .. }));

        match rx_b.try_recv().unwrap() {
            ServerEvent::IceCandidate { candidate, from, .. } => {
                assert!(candidate["candidate"].as_str().unwrap().starts_with("candidate:"));
                assert_eq!(from, PeerRole::Sender);
            }
            other => panic!("expected ice_candidate, got {:?}", other),
        }
    }

    #[test]
    fn test_detach_notifies_peer_and_marks_session() {
        let h = Harness::new();
        let _rx_a = h.attach("A", None);
        let mut rx_b = h.attach("B", None);

        h.relay.handle_event(
            "A",
            ClientEvent::CreateSession {
                session_id: Some("s".into()),
            },
        );
        h.relay
            .handle_event("B", ClientEvent::JoinSession { session_id: "s".into() });

        h.relay.handle_detach("A");

        match rx_b.try_recv().unwrap() {
            ServerEvent::PeerDisconnected { session_id } => assert_eq!(session_id, "s"),
            other => panic!("expected peer_disconnected, got {:?}", other),
        }

        // Session is marked but retained
        let session = h.sessions.get("s").unwrap();
        assert!(session.disconnected_at.is_some());
        assert_eq!(h.relay.connection_count(), 1);
    }

    #[test]
    fn test_detach_without_receiver() {
        let h = Harness::new();
        let _rx_a = h.attach("A", None);

        h.relay.handle_event(
            "A",
            ClientEvent::CreateSession {
                session_id: Some("s".into()),
            },
        );

        // No receiver yet: nobody to notify, but the session is marked
        h.relay.handle_detach("A");
        assert!(h.sessions.get("s").unwrap().disconnected_at.is_some());
    }

    #[test]
    fn test_detach_clears_presence() {
        let h = Harness::new();
        let _rx1 = h.attach("A1", Some("alice@example.com"));
        let _rx2 = h.attach("A2", Some("alice@example.com"));

        h.relay.handle_detach("A1");
        let conns = h.presence.connections("alice@example.com").unwrap();
        assert_eq!(conns.len(), 1);
        assert!(conns.contains("A2"));

        h.relay.handle_detach("A2");
        assert!(h.presence.connections("alice@example.com").is_none());
    }

    #[test]
    fn test_relay_after_peer_detach_fails() {
        let h = Harness::new();
        let mut rx_a = h.attach("A", None);
        let _rx_b = h.attach("B", None);

        h.relay.handle_event(
            "A",
            ClientEvent::CreateSession {
                session_id: Some("s".into()),
            },
        );
        h.relay
            .handle_event("B", ClientEvent::JoinSession { session_id: "s".into() });
        rx_a.try_recv().unwrap();

        h.relay.handle_detach("B");
        match rx_a.try_recv().unwrap() {
            ServerEvent::PeerDisconnected { session_id } => assert_eq!(session_id, "s"),
            other => panic!("expected peer_disconnected, got {:?}", other),
        }

        // The receiver slot is still set, but the connection behind it
        // is gone; the relay fails locally
        let reply = h.relay.handle_event(
            "A",
            ClientEvent::RelaySignal {
                session_id: "s".into(),
                signal: json!({"type": "offer"}),
            },
        );
        assert_eq!(expect_error(reply), ErrorCode::NoTargetPeer);
    }

    #[test]
    fn test_ping_pong() {
        let h = Harness::new();
        let reply = h.relay.handle_event("A", ClientEvent::Ping { timestamp: 42 });
        assert!(matches!(reply, ServerEvent::Pong { timestamp: 42 }));
    }
}
