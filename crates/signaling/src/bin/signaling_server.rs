//! Room signaling server binary entry point
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address (0.0.0.0:8080)
//! cargo run --bin signaling_server
//!
//! # Load a config file and override the bind address
//! cargo run --bin signaling_server -- \
//!   --config ./signaling.toml \
//!   --bind 127.0.0.1:9000
//!
//! # Configure STUN/TURN servers
//! cargo run --bin signaling_server -- \
//!   --stun-servers stun:stun.l.google.com:19302 \
//!   --turn-servers turn:turn.example.com:3478:user:secret
//! ```

use anyhow::{bail, Context};
use clap::Parser;
use roomrtc_signaling::{
    RoomRegistry, RtcMediaServer, SignalingConfig, SignalingServer, TurnServerConfig,
};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Room signaling server
///
/// Clients join named rooms over WebSocket and negotiate their media
/// connection with the server.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (.toml or .json)
    #[arg(short, long, env = "SIGNALING_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(short, long, env = "SIGNALING_BIND_ADDRESS")]
    bind: Option<String>,

    /// STUN servers (comma-separated)
    #[arg(long, value_delimiter = ',', env = "SIGNALING_STUN_SERVERS")]
    stun_servers: Option<Vec<String>>,

    /// TURN servers (format: turn:host:port:username:password, comma-separated)
    #[arg(long, value_delimiter = ',', env = "SIGNALING_TURN_SERVERS")]
    turn_servers: Vec<String>,

    /// Request Plan-B SDP semantics for media connections
    #[arg(long, env = "SIGNALING_PLAN_B")]
    plan_b: Option<bool>,

    /// Message sent to every client on connect
    #[arg(long, env = "SIGNALING_WELCOME_MESSAGE")]
    welcome_message: Option<String>,
}

/// Parse TURN server string (format: turn:host:port:username:password or turns:host:port:username:password)
fn parse_turn_server(s: &str) -> anyhow::Result<TurnServerConfig> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() < 5 {
        bail!(
            "Invalid TURN server format: '{}'. Expected: turn:host:port:username:password",
            s
        );
    }

    let protocol = parts[0];
    if protocol != "turn" && protocol != "turns" {
        bail!(
            "Invalid TURN protocol: '{}'. Expected 'turn' or 'turns'",
            protocol
        );
    }

    // Password may contain colons
    Ok(TurnServerConfig {
        url: format!("{}:{}:{}", protocol, parts[1], parts[2]),
        username: parts[3].to_string(),
        credential: parts[4..].join(":"),
    })
}

/// Build the configuration: file (or defaults), then CLI overrides
fn build_config_from_args(args: &Args) -> anyhow::Result<SignalingConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            SignalingConfig::from_file(path)
                .with_context(|| format!("Failed to load {}", path.display()))?
        }
        None => SignalingConfig::default(),
    };

    if let Some(bind) = &args.bind {
        config = config.with_bind_address(bind);
    }
    if let Some(stun_servers) = &args.stun_servers {
        config = config.with_stun_servers(stun_servers.clone());
    }
    if !args.turn_servers.is_empty() {
        let turn_servers = args
            .turn_servers
            .iter()
            .map(|s| parse_turn_server(s))
            .collect::<anyhow::Result<Vec<_>>>()?;
        for turn in &turn_servers {
            info!("Adding TURN server: {} (user: {})", turn.url, turn.username);
        }
        config = config.with_turn_servers(turn_servers);
    }
    if let Some(plan_b) = args.plan_b {
        config = config.with_plan_b(plan_b);
    }
    if let Some(message) = &args.welcome_message {
        config = config.with_welcome_message(message);
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let interrupted = AtomicBool::new(false);
    ctrlc::set_handler(move || {
        if interrupted.swap(true, Ordering::SeqCst) {
            eprintln!("Shutdown already in progress, forcing exit");
            std::process::exit(1);
        }
        let _ = shutdown_tx.send(true);
    })
    .context("Failed to set Ctrl+C handler")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(num_cpus::get())
        .thread_name("signaling-worker")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args, shutdown_rx))
}

async fn async_main(args: Args, mut shutdown_rx: watch::Receiver<bool>) -> anyhow::Result<()> {
    init_tracing();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Room signaling server starting"
    );

    let config = Arc::new(build_config_from_args(&args)?);
    info!(
        bind_address = %config.bind_address,
        stun_servers = ?config.stun_servers,
        turn_servers = config.turn_servers.len(),
        use_plan_b = config.connection.use_plan_b,
        "Signaling server configuration"
    );

    let media = Arc::new(RtcMediaServer::new(&config));
    let registry = Arc::new(RoomRegistry::new(media, Arc::clone(&config)));

    let server = SignalingServer::new(Arc::clone(&registry))?;
    let handle = server.start().await?;

    info!("Server running on ws://{}. Press Ctrl+C to shutdown.", handle.local_addr());

    while !*shutdown_rx.borrow() {
        if shutdown_rx.changed().await.is_err() {
            break;
        }
    }

    info!("Shutdown signal received, cleaning up...");

    handle.shutdown().await;
    registry.shutdown().await;

    info!(
        rooms = registry.room_count().await,
        "Signaling server shut down gracefully"
    );

    Ok(())
}

fn init_tracing() {
    // RUST_LOG wins, otherwise info
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
