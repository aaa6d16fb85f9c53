//! Room registry using the Actor pattern.
//!
//! The registry is the server's authoritative state: the set of rooms with
//! their members, and the set of known clients with their display names.
//! It receives commands via a tokio mpsc channel and is the only owner of
//! that state, so every operation is serialized.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌──────────────────┐
//! │ Router / Admin  │────▶│  RegistryActor  │────▶│  Event Channels  │
//! └─────────────────┘     └─────────────────┘     └──────────────────┘
//!         │                       │                       │
//!         │   RegistryCommand     │   RoomEvent           │
//!         │   (mpsc channel)      │   (unbounded mpsc)    │
//!         ▼                       ▼                       ▼
//!   join/leave/post       BTreeMap<RoomName, Room>   Server broadcaster
//!   create/destroy        HashMap<Addr, Client>      sends rooms_update
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All operations in this module follow the panic-free policy:
//! - No `.unwrap()` or `.expect()` in production code
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::debug;

mod actor;
mod commands;
mod handle;

pub use actor::RegistryActor;
pub use commands::{Deliveries, RegistryCommand, RegistryError, RoomChange, RoomEvent};
pub use handle::RegistryHandle;

/// Command channel buffer size
const COMMAND_BUFFER: usize = 256;

/// Default interval between stale-client sweeps
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Lower bound on the sweep period
const MIN_CLEANUP_INTERVAL: Duration = Duration::from_secs(1);

/// Settings for the registry actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrySettings {
    /// Silence after which a client is forgotten; `None` keeps clients forever
    pub client_ttl: Option<Duration>,

    /// How often the cleanup task asks the actor to expire clients
    pub cleanup_interval: Duration,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            client_ttl: None,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

/// Spawn the registry actor with default settings (no client expiry).
///
/// # Example
///
/// ```no_run
/// use roomcastd::registry::spawn_registry;
///
/// #[tokio::main]
/// async fn main() {
///     let handle = spawn_registry();
///     let rooms = handle.list_rooms().await;
/// }
/// ```
pub fn spawn_registry() -> RegistryHandle {
    spawn_registry_with(RegistrySettings::default())
}

/// Spawn the registry actor and return a handle for interaction.
///
/// This function:
/// 1. Creates command and event channels
/// 2. Spawns the RegistryActor on a tokio task
/// 3. Spawns a background cleanup task if a client TTL is set
/// 4. Returns a RegistryHandle for client use
pub fn spawn_registry_with(settings: RegistrySettings) -> RegistryHandle {
    let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER);

    let actor = RegistryActor::new(cmd_rx, settings.client_ttl);
    tokio::spawn(actor.run());

    let handle = RegistryHandle::new(cmd_tx.clone());

    if settings.client_ttl.is_some() {
        spawn_cleanup_task(cmd_tx, settings.cleanup_interval);
    }

    handle
}

/// Spawn a background task that triggers periodic stale client cleanup.
fn spawn_cleanup_task(sender: mpsc::Sender<RegistryCommand>, period: Duration) {
    tokio::spawn(async move {
        let mut ticker = interval(period.max(MIN_CLEANUP_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; nothing can be stale yet
        ticker.tick().await;

        loop {
            ticker.tick().await;

            if sender.send(RegistryCommand::CleanupStale).await.is_err() {
                // Channel closed, actor stopped - exit cleanup task
                debug!("Cleanup task stopping: registry channel closed");
                break;
            }

            debug!("Triggered stale client cleanup");
        }
    });
}
