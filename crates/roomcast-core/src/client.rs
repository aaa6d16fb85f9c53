//! Known clients, keyed by transport address.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Transport endpoint identifying a client.
///
/// There is no handshake: a client exists from the first datagram seen
/// from its address.
pub type ClientAddress = SocketAddr;

/// A registered client.
#[derive(Debug, Clone)]
pub struct Client {
    address: ClientAddress,
    display_name: String,
    last_seen: Instant,
}

impl Client {
    pub fn new(address: ClientAddress, display_name: impl Into<String>, now: Instant) -> Self {
        Self {
            address,
            display_name: display_name.into(),
            last_seen: now,
        }
    }

    pub fn address(&self) -> ClientAddress {
        self.address
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Overwrites the display name. No uniqueness check is made.
    pub fn rename(&mut self, display_name: impl Into<String>) {
        self.display_name = display_name.into();
    }

    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }

    /// Records activity from this client.
    pub fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }

    /// Returns true if nothing has been heard from this client for longer than `ttl`.
    #[must_use]
    pub fn is_stale(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.last_seen) > ttl
    }
}
