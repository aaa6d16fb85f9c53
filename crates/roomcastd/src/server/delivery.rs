//! Fire-and-forget datagram delivery.

use tokio::net::UdpSocket;
use tracing::{debug, error, warn};

use roomcast_protocol::{encode, MAX_DATAGRAM_SIZE};

use crate::router::Outbound;

/// Encodes and sends one message.
///
/// Failures are logged and otherwise ignored: an unreachable client is
/// part of the unreliable-transport contract, and nothing is retried.
pub async fn deliver(socket: &UdpSocket, outbound: &Outbound) {
    let bytes = match encode(&outbound.message) {
        Ok(b) => b,
        Err(e) => {
            error!(error = %e, "Failed to serialize message");
            return;
        }
    };

    if bytes.len() > MAX_DATAGRAM_SIZE {
        // Still sent: clients with larger buffers can read it
        warn!(
            to = %outbound.to,
            kind = outbound.message.kind().tag(),
            size = bytes.len(),
            max = MAX_DATAGRAM_SIZE,
            "Outbound datagram exceeds protocol size"
        );
    }

    match socket.send_to(&bytes, outbound.to).await {
        Ok(_) => {
            debug!(
                to = %outbound.to,
                kind = outbound.message.kind().tag(),
                "Datagram sent"
            );
        }
        Err(e) => {
            debug!(to = %outbound.to, error = %e, "Failed to send datagram");
        }
    }
}
