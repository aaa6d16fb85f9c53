//! Datagram router: decode one payload, apply it to the registry, build replies.
//!
//! The router is stateless apart from its registry handle and is shared by
//! every datagram task. It never sends anything itself; it returns the
//! outbound messages and the transport loop delivers them.
//!
//! | request                | registry call       | replies                               |
//! |------------------------|---------------------|---------------------------------------|
//! | `register`             | `register_client`   | `rooms_update` to sender              |
//! | `rooms_update_request` | `list_rooms`        | `rooms_update` to sender              |
//! | `join`                 | `join_room`         | `join` notice or `error` to sender    |
//! | `leave`                | `leave_room`        | `leave` notice or `error` to sender   |
//! | `message`              | `route_message`     | `message` to every other member       |

use tracing::{debug, error, warn};

use roomcast_core::{ClientAddress, DomainError, JoinOutcome, LeaveOutcome, RoomName};
use roomcast_protocol::{decode, WireMessage};

use crate::registry::{RegistryError, RegistryHandle};

/// A message addressed to one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: ClientAddress,
    pub message: WireMessage,
}

impl Outbound {
    pub fn new(to: ClientAddress, message: WireMessage) -> Self {
        Self { to, message }
    }
}

/// Routes decoded requests to the registry.
#[derive(Clone)]
pub struct Router {
    registry: RegistryHandle,
}

impl Router {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    /// Handles one inbound datagram and returns the messages to send.
    ///
    /// Payloads that don't decode to a client request are dropped with a
    /// log line and produce no reply.
    pub async fn route(&self, payload: &[u8], from: ClientAddress) -> Vec<Outbound> {
        let message = match decode(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(client = %from, error = %e, "Dropping undecodable datagram");
                return Vec::new();
            }
        };

        let kind = message.kind();
        if !kind.is_request() {
            warn!(client = %from, kind = kind.tag(), "Dropping server-only message from client");
            return Vec::new();
        }

        debug!(client = %from, kind = kind.tag(), "Routing request");
        self.registry.touch(from).await;

        match self.dispatch(message, from).await {
            Ok(outbound) => outbound,
            Err(e) => {
                error!(client = %from, kind = kind.tag(), error = %e, "Registry unavailable");
                Vec::new()
            }
        }
    }

    /// Maps one request to its registry operation.
    async fn dispatch(
        &self,
        message: WireMessage,
        from: ClientAddress,
    ) -> Result<Vec<Outbound>, RegistryError> {
        match message {
            WireMessage::Register { username } => {
                let rooms = self.registry.register_client(from, username).await?;
                Ok(vec![Outbound::new(from, WireMessage::rooms_update(rooms))])
            }
            WireMessage::RoomsUpdateRequest => {
                let rooms = self.registry.list_rooms().await;
                Ok(vec![Outbound::new(from, WireMessage::rooms_update(rooms))])
            }
            WireMessage::Join { room, .. } => {
                let outcome = self.registry.join_room(room.clone(), from).await?;
                Ok(vec![Outbound::new(from, join_reply(room, outcome))])
            }
            WireMessage::Leave { room, .. } => {
                let outcome = self.registry.leave_room(room.clone(), from).await?;
                Ok(vec![Outbound::new(from, leave_reply(room, outcome))])
            }
            WireMessage::Chat { room, message } => self.relay(room, message, from).await,
            WireMessage::RoomsUpdate { .. } | WireMessage::Error { .. } => Ok(Vec::new()),
        }
    }

    /// Relays a chat post to the other members of the room.
    ///
    /// An unknown room is dropped silently: a well-behaved client only posts
    /// to rooms it has joined.
    async fn relay(
        &self,
        room: RoomName,
        text: String,
        from: ClientAddress,
    ) -> Result<Vec<Outbound>, RegistryError> {
        match self.registry.route_message(room.clone(), text, from).await {
            Ok(deliveries) => Ok(deliveries
                .into_iter()
                .map(|(to, line)| {
                    Outbound::new(
                        to,
                        WireMessage::Chat {
                            room: room.clone(),
                            message: line,
                        },
                    )
                })
                .collect()),
            Err(RegistryError::Domain(DomainError::RoomNotFound { room })) => {
                debug!(client = %from, room = %room, "Chat for unknown room dropped");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}

fn join_reply(room: RoomName, outcome: JoinOutcome) -> WireMessage {
    let notice = outcome.notice(&room);
    match outcome {
        JoinOutcome::RoomNotFound => WireMessage::error(notice),
        JoinOutcome::Joined | JoinOutcome::AlreadyMember => WireMessage::joined(room, notice),
    }
}

fn leave_reply(room: RoomName, outcome: LeaveOutcome) -> WireMessage {
    let notice = outcome.notice(&room);
    match outcome {
        LeaveOutcome::RoomNotFound => WireMessage::error(notice),
        LeaveOutcome::Left | LeaveOutcome::NotMember => WireMessage::left(room, notice),
    }
}
