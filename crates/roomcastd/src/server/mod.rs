//! UDP transport loop for the relay.
//!
//! The server:
//! - Receives datagrams on a single UDP socket
//! - Spawns one task per datagram, bounded by a semaphore
//! - Sends the router's replies back over the same socket
//! - Fans registry events (room list changes, evictions) out to clients
//! - Supports graceful shutdown via CancellationToken
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │   ChatServer    │
//! │                 │
//! │   UdpSocket     │◀──────────────────────────────┐
//! └───────┬─────────┘                               │
//!         │ recv_from() + permit                    │ send_to()
//!         ▼                                         │
//! ┌─────────────────┐     ┌─────────────────┐       │
//! │ datagram task   │────▶│     Router      │───────┤
//! │ (per datagram)  │     │ RegistryHandle  │       │
//! └─────────────────┘     └─────────────────┘       │
//!                                                   │
//! ┌─────────────────┐     ┌─────────────────┐       │
//! │ RegistryActor   │────▶│   broadcaster   │───────┘
//! │  (RoomEvent)    │     │                 │
//! └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Receive and send errors are logged and allow continued operation

mod broadcast;
mod delivery;

pub use broadcast::event_outbound;
pub use delivery::deliver;

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::registry::{RegistryError, RegistryHandle, RoomEvent};
use crate::router::Router;

/// Default bind address
pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::LOCALHOST, 12345));

/// Default cap on concurrently handled datagrams
pub const DEFAULT_MAX_IN_FLIGHT: usize = 256;

/// Receive buffer size: the largest UDP payload over IPv4.
///
/// Bigger than the protocol limit so oversized datagrams are seen whole
/// and rejected by the decoder instead of being silently truncated.
const RECV_BUFFER_SIZE: usize = 65_507;

/// UDP server for the room relay.
pub struct ChatServer {
    socket: Arc<UdpSocket>,

    router: Router,

    /// Registry events, subscribed at bind time so none are missed
    events: mpsc::UnboundedReceiver<RoomEvent>,

    /// Cancellation token for graceful shutdown
    cancel_token: CancellationToken,

    /// Caps the number of datagram tasks alive at once
    permits: Arc<Semaphore>,
}

impl ChatServer {
    /// Binds the UDP socket and prepares the server.
    ///
    /// # Arguments
    ///
    /// * `addr` - Address to bind; port 0 picks a free port
    /// * `registry` - Handle to the room registry
    /// * `cancel_token` - Token for graceful shutdown
    /// * `max_in_flight` - Maximum concurrently handled datagrams (at least 1)
    ///
    /// # Errors
    ///
    /// - `ServerError::Bind` if the socket can't be bound
    /// - `ServerError::Registry` if the registry has shut down
    pub async fn bind(
        addr: SocketAddr,
        registry: RegistryHandle,
        cancel_token: CancellationToken,
        max_in_flight: usize,
    ) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr,
                error: e.to_string(),
            })?;
        let events = registry.subscribe().await?;

        Ok(Self {
            socket: Arc::new(socket),
            events,
            router: Router::new(registry),
            cancel_token,
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        })
    }

    /// Returns the address the socket is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.socket
            .local_addr()
            .map_err(|e| ServerError::LocalAddr(e.to_string()))
    }

    /// Runs the server.
    ///
    /// Receives datagrams until the cancellation token is triggered.
    /// This method does not return until shutdown.
    pub async fn run(self) -> Result<(), ServerError> {
        let local_addr = self.local_addr()?;
        info!(
            addr = %local_addr,
            max_in_flight = self.permits.available_permits(),
            "Relay listening"
        );

        let ChatServer {
            socket,
            router,
            events,
            cancel_token,
            permits,
        } = self;

        broadcast::spawn_event_broadcaster(Arc::clone(&socket), events, cancel_token.clone());

        let mut buf = vec![0u8; RECV_BUFFER_SIZE];
        let mut received: u64 = 0;

        loop {
            // Wait for capacity before reading, so load is bounded
            let permit = tokio::select! {
                _ = cancel_token.cancelled() => break,
                permit = Arc::clone(&permits).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let (len, from) = tokio::select! {
                _ = cancel_token.cancelled() => break,
                result = socket.recv_from(&mut buf) => match result {
                    Ok(r) => r,
                    Err(e) => {
                        // e.g. ICMP port-unreachable from an earlier send
                        debug!(error = %e, "Receive failed");
                        continue;
                    }
                },
            };

            received += 1;
            let payload = buf.get(..len).unwrap_or_default().to_vec();
            spawn_datagram_task(Arc::clone(&socket), router.clone(), payload, from, permit);
        }

        info!(received, "Relay shutdown requested");
        Ok(())
    }
}

/// Handles one datagram on its own task.
///
/// The permit is held until every reply has been handed to the socket.
fn spawn_datagram_task(
    socket: Arc<UdpSocket>,
    router: Router,
    payload: Vec<u8>,
    from: SocketAddr,
    permit: OwnedSemaphorePermit,
) {
    tokio::spawn(async move {
        let outbound = router.route(&payload, from).await;
        for out in &outbound {
            deliver(&socket, out).await;
        }
        drop(permit);
    });
}

/// Errors that can occur in server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind UDP socket at {addr}: {error}")]
    Bind { addr: SocketAddr, error: String },

    #[error("Failed to read local address: {0}")]
    LocalAddr(String),

    #[error("Registry unavailable: {0}")]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_addr() {
        assert_eq!(DEFAULT_BIND_ADDR.to_string(), "127.0.0.1:12345");
        assert!(DEFAULT_BIND_ADDR.ip().is_loopback());
    }

    #[test]
    fn test_server_error_display() {
        let err = ServerError::Bind {
            addr: "127.0.0.1:9".parse().unwrap(),
            error: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("127.0.0.1:9"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let registry = crate::registry::spawn_registry();
        let server = ChatServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            registry,
            CancellationToken::new(),
            0,
        )
        .await
        .unwrap();

        assert_ne!(server.local_addr().unwrap().port(), 0);
        // Zero is clamped so the loop can make progress
        assert_eq!(server.permits.available_permits(), 1);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let registry = crate::registry::spawn_registry();
        let cancel = CancellationToken::new();
        let server = ChatServer::bind("127.0.0.1:0".parse().unwrap(), registry, cancel.clone(), 4)
            .await
            .unwrap();

        let task = tokio::spawn(server.run());
        cancel.cancel();

        let result = tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }
}
