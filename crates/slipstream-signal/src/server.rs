//! WebSocket signal server implementation

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::handshake::server::{Request, Response},
    tungstenite::Message,
};
use tracing::{debug, info};

use slipstream_core::{generate_connection_id, Config};

use crate::messages::{ClientEvent, ErrorCode, ServerEvent};
use crate::presence::PresenceTracker;
use crate::registry::ConnectionRegistry;
use crate::relay::SignalRelay;
use crate::session::SessionStore;

/// Signal server state
pub struct SignalServer {
    /// Event handlers over the shared stores
    relay: Arc<SignalRelay>,
    /// Session store, shared with the relay
    sessions: Arc<SessionStore>,
    /// Server configuration
    config: Config,
}

impl SignalServer {
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let presence = Arc::new(PresenceTracker::new());
        let sessions = Arc::new(SessionStore::with_max_file_size(config.signal.max_file_size));
        let relay = Arc::new(SignalRelay::new(registry, presence, sessions.clone()));

        Self {
            relay,
            sessions,
            config,
        }
    }

    /// Start the signal server
    pub async fn serve(&self, addr: SocketAddr) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(addr).await?;
        info!("Signal server listening on {}", addr);

        // Start the idle-session sweep task
        let sessions = self.sessions.clone();
        let max_idle = Duration::from_secs(self.config.signal.session_idle_timeout_secs);
        let sweep_interval = Duration::from_secs(self.config.signal.sweep_interval_secs);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(sweep_interval);
            interval.tick().await; // first tick fires immediately
            loop {
                interval.tick().await;
                sessions.sweep_idle(max_idle);
            }
        });

        let ice_config = serde_json::json!({ "iceServers": &self.config.ice.servers }).to_string();

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            let relay = self.relay.clone();
            let sessions = self.sessions.clone();
            let ice_config = ice_config.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, relay, sessions, ice_config).await {
                    debug!("Connection error from {}: {:?}", peer_addr, e);
                }
            });
        }
    }

    /// Get session count (for monitoring)
    pub fn session_count(&self) -> usize {
        self.sessions.session_count()
    }

    /// Get connection count (for monitoring)
    pub fn connection_count(&self) -> usize {
        self.relay.connection_count()
    }
}

impl Default for SignalServer {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

/// Handle a single connection (HTTP or WebSocket)
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    relay: Arc<SignalRelay>,
    sessions: Arc<SessionStore>,
    ice_config: String,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Peek at the request head to route plain HTTP requests (health
    // checks, the advisory REST surface) away from the WebSocket upgrade
    let mut peek_buf = [0u8; 1024];
    let n = stream.peek(&mut peek_buf).await?;
    let head = String::from_utf8_lossy(&peek_buf[..n]).to_ascii_lowercase();

    if (head.starts_with("get ") || head.starts_with("post "))
        && !head.contains("upgrade: websocket")
    {
        return handle_http_request(&mut stream, &relay, &sessions, &ice_config).await;
    }

    // Capture the upgrade request's query string for the optional identity
    let mut identity: Option<String> = None;
    let ws_stream = accept_hdr_async(stream, |request: &Request, response: Response| {
        identity = request.uri().query().and_then(identity_from_query);
        Ok(response)
    })
    .await?;
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // The transport issues the connection id at attach
    let conn_id = generate_connection_id();
    debug!("New connection from {} as {}", peer_addr, conn_id);

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    relay.handle_attach(&conn_id, identity.as_deref(), tx.clone());

    // Writer task: drains replies and peer notifications in order
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match event.to_json() {
                Ok(json) => json,
                Err(e) => {
                    debug!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        let msg = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            // tungstenite queues the pong reply itself
            Ok(_) => continue,
            Err(e) => {
                debug!("WebSocket error: {:?}", e);
                break;
            }
        };

        let event = match ClientEvent::from_json(&msg) {
            Ok(e) => e,
            Err(e) => {
                let error =
                    ServerEvent::error(ErrorCode::InvalidMessage, format!("Invalid JSON: {}", e));
                if tx.send(error).is_err() {
                    break;
                }
                continue;
            }
        };

        let reply = relay.handle_event(&conn_id, event);
        if tx.send(reply).is_err() {
            break;
        }
    }

    // Cleanup on disconnect: notify peers, mark sessions
    relay.handle_detach(&conn_id);
    drop(tx);
    let _ = writer.await;

    debug!("Connection closed: {}", conn_id);
    Ok(())
}

/// Handle a plain HTTP request (health checks and the advisory REST surface)
async fn handle_http_request(
    stream: &mut TcpStream,
    relay: &SignalRelay,
    sessions: &SessionStore,
    ice_config: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Read the HTTP request
    let mut buf = vec![0u8; 1024];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);

    // Parse the request path
    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/");

    let (status, body) = route_http(path, relay, sessions, ice_config);

    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );

    stream.write_all(response.as_bytes()).await?;
    Ok(())
}

/// Route an HTTP path to its advisory response
fn route_http(
    path: &str,
    relay: &SignalRelay,
    sessions: &SessionStore,
    ice_config: &str,
) -> (&'static str, String) {
    if let Some(session_id) = path.strip_prefix("/api/transfer/session/") {
        // Advisory existence lookup; real state lives behind the event contract
        let body = serde_json::json!({
            "exists": sessions.contains(session_id),
            "session_id": session_id,
        });
        return ("200 OK", body.to_string());
    }

    match path {
        "/health" => (
            "200 OK",
            format!(
                r#"{{"status":"healthy","sessions":{},"connections":{}}}"#,
                relay.session_count(),
                relay.connection_count()
            ),
        ),
        "/api/transfer/create-session" => (
            "200 OK",
            r#"{"success":true,"message":"Session creation is handled via WebSockets. Please use the WebSocket interface."}"#
                .to_string(),
        ),
        "/api/stun-config" => ("200 OK", ice_config.to_string()),
        _ => ("404 Not Found", r#"{"error":"not found"}"#.to_string()),
    }
}

/// Extract the identity parameter from an upgrade request's query string
fn identity_from_query(query: &str) -> Option<String> {
    query
        .split('&')
        .find_map(|pair| pair.strip_prefix("identity="))
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
