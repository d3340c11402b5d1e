//! Slipstream Signal Server
//!
//! Lightweight WebSocket signaling server for brokering P2P transfers.
//!
//! # Usage
//!
//! ```bash
//! # Defaults (0.0.0.0:8080)
//! slipstream-signal
//!
//! # Custom port and config file
//! slipstream-signal --port 9000 --config /etc/slipstream/config.toml
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use slipstream_core::{Config, DEFAULT_PORT};
use slipstream_signal::SignalServer;

#[derive(Parser, Debug)]
#[command(name = "slipstream-signal")]
#[command(about = "Slipstream signaling server for P2P transfer handshakes")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Bind address
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    /// Config file path (optional, uses defaults if not specified)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;

    info!("Starting Slipstream Signal Server");
    info!(
        "Session idle timeout: {}s, sweep every {}s",
        config.signal.session_idle_timeout_secs, config.signal.sweep_interval_secs
    );

    let server = SignalServer::new(config);
    server.serve(addr).await?;

    Ok(())
}
