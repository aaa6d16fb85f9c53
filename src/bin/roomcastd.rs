//! roomcastd - room-based chat relay over UDP
//!
//! Runs the relay in the foreground. Rooms are managed from the admin
//! console on stdin; clients talk to the UDP socket.
//!
//! # Usage
//!
//! ```bash
//! # Start on the default address (127.0.0.1:12345)
//! roomcastd
//!
//! # Listen on all interfaces with two rooms ready
//! roomcastd --bind 0.0.0.0:12345 --room general --room random
//!
//! # Forget clients silent for an hour, no console (under a supervisor)
//! roomcastd --client-ttl 3600 --no-console
//!
//! # Custom config file / bind address from the environment
//! roomcastd --config ./roomcastd.toml
//! ROOMCAST_BIND=0.0.0.0:9000 roomcastd
//!
//! # Enable debug logging
//! RUST_LOG=roomcastd=debug roomcastd
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: Graceful shutdown

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use roomcastd::admin::run_console;
use roomcastd::config::{ConfigOverrides, ServerConfig};
use roomcastd::registry::spawn_registry_with;
use roomcastd::server::ChatServer;

/// Time allowed for tasks to wind down after shutdown.
///
/// The console's stdin read runs on a blocking thread that only returns on
/// the next line, so the runtime is not waited on indefinitely.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

/// roomcastd - connectionless room-based chat relay
#[derive(Parser, Debug)]
#[command(name = "roomcastd", version, about)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// UDP address to bind (overrides config and ROOMCAST_BIND)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Maximum datagrams handled concurrently
    #[arg(long)]
    max_in_flight: Option<usize>,

    /// Forget clients silent for this many seconds (0 disables)
    #[arg(long, value_name = "SECS")]
    client_ttl: Option<u64>,

    /// Room to create at startup (repeatable)
    #[arg(short, long = "room", value_name = "NAME")]
    rooms: Vec<String>,

    /// Don't read admin commands from stdin
    #[arg(long)]
    no_console: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            bind: self.bind,
            max_in_flight: self.max_in_flight,
            client_ttl_secs: self.client_ttl,
            rooms: self.rooms.clone(),
            no_console: self.no_console,
        }
    }
}

/// Builds the effective configuration from file, environment and flags.
fn load_config(args: &Args) -> Result<ServerConfig> {
    let mut config =
        ServerConfig::discover(args.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply_env(|key| env::var(key).ok())
        .context("Invalid environment override")?;
    config.apply_overrides(args.overrides());
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    let result = runtime.block_on(run_server(config));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    result
}

/// Runs the relay (async entry point).
async fn run_server(config: ServerConfig) -> Result<()> {
    // Logs go to stderr so the console prompt on stdout stays readable
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("roomcastd=info".parse()?),
        )
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        "roomcast relay starting"
    );

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let registry = spawn_registry_with(config.registry_settings());
    info!(
        client_ttl_secs = config.client_ttl_secs,
        "Room registry started"
    );

    for room in config.initial_rooms() {
        match registry.create_room(room.clone()).await {
            Ok(()) => info!(room = %room, "Initial room created"),
            Err(e) => warn!(room = %room, error = %e, "Skipping initial room"),
        }
    }

    // Bind before starting the console so room events reach the broadcaster
    let server = ChatServer::bind(
        config.bind,
        registry.clone(),
        cancel_token.clone(),
        config.max_in_flight,
    )
    .await?;

    if config.console {
        let console_registry = registry.clone();
        let console_token = cancel_token.clone();
        tokio::spawn(async move {
            let stdin = BufReader::new(tokio::io::stdin());
            match run_console(stdin, tokio::io::stdout(), console_registry, console_token).await {
                Ok(()) => info!("Admin console closed"),
                Err(e) => warn!(error = %e, "Admin console failed"),
            }
        });
    }

    if let Err(e) = server.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("roomcast relay stopped");
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}
