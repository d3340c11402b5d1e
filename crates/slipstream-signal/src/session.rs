//! Session management for the signal server
//!
//! A session pairs one sender with at most one receiver while they
//! negotiate a direct data channel. All mutations run under a single
//! mutex: concurrent `create` calls on the same requested id admit at
//! most one winner, and concurrent `join` calls on the same session
//! admit exactly one.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info};

use slipstream_core::{
    generate_session_id, validate_session_id, ConnectionId, SessionError, SessionId,
    DEFAULT_MAX_FILE_SIZE,
};

/// One sender/receiver pairing negotiating a data channel
#[derive(Clone, Debug)]
pub struct Session {
    /// Session id, unique among active sessions
    pub id: SessionId,

    /// Connection that created the session; immutable
    pub sender: ConnectionId,

    /// Connection that joined as receiver; write-once
    pub receiver: Option<ConnectionId>,

    /// When the session was created
    pub created_at: Instant,

    /// Transfer size hint for the data plane; not enforced here
    pub max_file_size: u64,

    /// Set when either party's connection is lost; the record is kept
    /// until the sweep removes it
    pub disconnected_at: Option<Instant>,

    /// Last create/join/relay touching this session; drives the sweep
    pub last_activity: Instant,
}

impl Session {
    /// The other party's connection, from the caller's perspective
    ///
    /// Returns `receiver` if the caller is the sender, else `sender`.
    pub fn peer_of(&self, conn_id: &str) -> Option<&ConnectionId> {
        if self.sender == conn_id {
            self.receiver.as_ref()
        } else {
            Some(&self.sender)
        }
    }

    /// Whether the connection is a party of this session
    pub fn contains(&self, conn_id: &str) -> bool {
        self.sender == conn_id || self.receiver.as_deref() == Some(conn_id)
    }
}

/// Owns the set of active sessions
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Session>>,
    max_file_size: u64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_max_file_size(DEFAULT_MAX_FILE_SIZE)
    }

    /// Create a store handing out a specific transfer size hint
    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_file_size,
        }
    }

    /// Create a new session with `sender` as its creating connection
    ///
    /// Uses `requested` as the id if supplied and well-formed, otherwise
    /// generates one.
    pub fn create(
        &self,
        requested: Option<SessionId>,
        sender: ConnectionId,
    ) -> Result<SessionId, SessionError> {
        let mut sessions = self.sessions.lock();

        let id = requested
            .filter(|id| validate_session_id(id))
            .unwrap_or_else(generate_session_id);
        if sessions.contains_key(&id) {
            return Err(SessionError::AlreadyExists(id));
        }

        let now = Instant::now();
        sessions.insert(
            id.clone(),
            Session {
                id: id.clone(),
                sender,
                receiver: None,
                created_at: now,
                max_file_size: self.max_file_size,
                disconnected_at: None,
                last_activity: now,
            },
        );

        Ok(id)
    }

    /// Set the session's receiver; exactly one concurrent join wins
    ///
    /// Returns the sender's connection id so the relay layer can notify
    /// it that a receiver joined.
    pub fn join(&self, id: &str, conn_id: ConnectionId) -> Result<ConnectionId, SessionError> {
        let mut sessions = self.sessions.lock();

        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_owned()))?;

        if session.receiver.is_some() {
            return Err(SessionError::ReceiverAlreadySet(id.to_owned()));
        }

        session.receiver = Some(conn_id);
        session.last_activity = Instant::now();
        Ok(session.sender.clone())
    }

    /// Read-only lookup
    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.lock().get(id).cloned()
    }

    /// Whether a session with this id is active
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.lock().contains_key(id)
    }

    /// Record that a party's connection was lost
    ///
    /// Sets `disconnected_at` if unset; the record is not deleted.
    pub fn mark_disconnected(&self, id: &str) {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get_mut(id) {
            if session.disconnected_at.is_none() {
                session.disconnected_at = Some(Instant::now());
                debug!("Session {} marked as disconnected", id);
            }
        }
    }

    /// Mark relay activity on a session
    pub fn touch(&self, id: &str) {
        let mut sessions = self.sessions.lock();
        if let Some(session) = sessions.get_mut(id) {
            session.last_activity = Instant::now();
        }
    }

    /// All sessions where the connection is sender or receiver
    ///
    /// A connection appears in at most one session as sender in
    /// practice, but callers must handle every match.
    pub fn sessions_containing(&self, conn_id: &str) -> Vec<Session> {
        self.sessions
            .lock()
            .values()
            .filter(|s| s.contains(conn_id))
            .cloned()
            .collect()
    }

    /// Remove sessions idle or disconnected for longer than `max_idle`
    ///
    /// Returns the number of sessions removed.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.lock();
        let before = sessions.len();

        sessions.retain(|_, s| {
            let stale = match s.disconnected_at {
                Some(at) => at.elapsed() > max_idle,
                None => s.last_activity.elapsed() > max_idle,
            };
            !stale
        });

        let removed = before - sessions.len();
        if removed > 0 {
            info!("Swept {} idle sessions", removed);
        }
        removed
    }

    /// Number of active sessions (for monitoring)
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
