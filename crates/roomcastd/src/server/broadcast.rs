//! Fan-out of registry events to clients.
//!
//! Room creation and destruction are the only broadcasts in the protocol:
//! every known client gets the new room list, and members of a destroyed
//! room are told they were removed.

use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use roomcast_core::ROOM_DELETED_NOTICE;
use roomcast_protocol::WireMessage;

use super::delivery::deliver;
use crate::registry::RoomEvent;
use crate::router::Outbound;

/// Builds the datagrams for one registry event.
pub fn event_outbound(event: RoomEvent) -> Vec<Outbound> {
    match event {
        RoomEvent::MembersEvicted { room, members } => members
            .into_iter()
            .map(|to| Outbound::new(to, WireMessage::left(room.clone(), ROOM_DELETED_NOTICE)))
            .collect(),
        RoomEvent::RoomsChanged {
            rooms, recipients, ..
        } => recipients
            .into_iter()
            .map(|to| Outbound::new(to, WireMessage::rooms_update(rooms.clone())))
            .collect(),
    }
}

/// Spawns the event broadcaster task.
///
/// Events are handled in order, so eviction notices for a destroyed room
/// go out before the room list that no longer contains it. The event
/// channel is unbounded: a burst of room changes queues up here instead
/// of displacing notices that are still unsent.
pub(super) fn spawn_event_broadcaster(
    socket: Arc<UdpSocket>,
    mut event_rx: mpsc::UnboundedReceiver<RoomEvent>,
    cancel_token: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    debug!("Event broadcaster shutting down");
                    break;
                }

                event = event_rx.recv() => {
                    let Some(event) = event else {
                        debug!("Event channel closed");
                        break;
                    };
                    if let RoomEvent::RoomsChanged { change, recipients, .. } = &event {
                        info!(%change, recipients = recipients.len(), "Broadcasting room list");
                    }
                    for out in event_outbound(event) {
                        deliver(&socket, &out).await;
                    }
                }
            }
        }
    });
}
