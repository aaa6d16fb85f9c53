//! Registry actor commands, errors, and events.
//!
//! This module defines the message types for communicating with the `RegistryActor`:
//! - `RegistryCommand`: Commands sent to the actor
//! - `RegistryError`: Errors that can occur during registry operations
//! - `RoomEvent`: Events published by the registry for the broadcaster
//!
//! All types are designed for async message passing and follow the panic-free policy.

use roomcast_core::{ClientAddress, DomainError, JoinOutcome, LeaveOutcome, RoomName};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

// ============================================================================
// Registry Commands
// ============================================================================

/// Recipients and rendered text for one relayed chat line.
pub type Deliveries = Vec<(ClientAddress, String)>;

/// Commands sent to the registry actor.
///
/// Each command uses a oneshot channel for the response, enabling
/// request-response patterns in async code without blocking. The actor
/// handles one command at a time, so every command is atomic with
/// respect to every other.
///
/// # Usage
///
/// ```ignore
/// let (tx, rx) = oneshot::channel();
/// registry_tx.send(RegistryCommand::JoinRoom {
///     room,
///     addr,
///     respond_to: tx,
/// }).await?;
/// let outcome = rx.await?;
/// ```
#[derive(Debug)]
pub enum RegistryCommand {
    /// Upsert a client's display name.
    ///
    /// Responds with the current room list as the client's initial snapshot.
    RegisterClient {
        addr: ClientAddress,
        display_name: String,
        respond_to: oneshot::Sender<Vec<RoomName>>,
    },

    /// Create an empty room and broadcast the new room list.
    ///
    /// # Errors
    /// - `DomainError::RoomExists` if the name is taken
    CreateRoom {
        room: RoomName,
        respond_to: oneshot::Sender<Result<(), RegistryError>>,
    },

    /// Destroy a room, evicting its members, and broadcast the new room list.
    ///
    /// Responds with the former members.
    ///
    /// # Errors
    /// - `DomainError::RoomNotFound` if the room doesn't exist
    DestroyRoom {
        room: RoomName,
        respond_to: oneshot::Sender<Result<Vec<ClientAddress>, RegistryError>>,
    },

    /// Snapshot of the current room names.
    ListRooms {
        respond_to: oneshot::Sender<Vec<RoomName>>,
    },

    /// Add an address to a room.
    JoinRoom {
        room: RoomName,
        addr: ClientAddress,
        respond_to: oneshot::Sender<JoinOutcome>,
    },

    /// Remove an address from a room.
    LeaveRoom {
        room: RoomName,
        addr: ClientAddress,
        respond_to: oneshot::Sender<LeaveOutcome>,
    },

    /// Render a chat line for every member of a room except the sender.
    ///
    /// # Errors
    /// - `DomainError::RoomNotFound` if the room doesn't exist
    RouteMessage {
        room: RoomName,
        text: String,
        sender: ClientAddress,
        respond_to: oneshot::Sender<Result<Deliveries, RegistryError>>,
    },

    /// Members of a room, or `None` if the room doesn't exist.
    GetMembers {
        room: RoomName,
        respond_to: oneshot::Sender<Option<Vec<ClientAddress>>>,
    },

    /// Registered display name of a client, if any.
    GetDisplayName {
        addr: ClientAddress,
        respond_to: oneshot::Sender<Option<String>>,
    },

    /// Record activity from an address (fire-and-forget).
    ///
    /// Unknown addresses are ignored: only `RegisterClient` creates clients.
    Touch { addr: ClientAddress },

    /// Expire clients that have been silent longer than the TTL (fire-and-forget).
    CleanupStale,

    /// Start receiving every `RoomEvent` published after this command.
    ///
    /// The channel is unbounded so no event is ever skipped; the
    /// subscriber is dropped once its receiver is gone.
    Subscribe {
        subscriber: mpsc::UnboundedSender<RoomEvent>,
    },
}

// ============================================================================
// Registry Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A room-level failure; the text is shown to admins or clients as-is.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The response channel was closed before receiving a response.
    ///
    /// This typically indicates the actor was shut down.
    #[error("response channel closed")]
    ChannelClosed,
}

impl RegistryError {
    pub fn room_not_found(room: RoomName) -> Self {
        Self::Domain(DomainError::RoomNotFound { room })
    }

    pub fn room_exists(room: RoomName) -> Self {
        Self::Domain(DomainError::RoomExists { room })
    }
}

// ============================================================================
// Room Events
// ============================================================================

/// Events published by the registry to subscribers.
///
/// Every subscriber receives every event, in publication order.
///
/// The server's broadcaster turns these into datagrams. Each event carries
/// the recipients as they were when the change happened, so the fan-out
/// matches the state the mutation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// Members were force-removed because their room was destroyed.
    MembersEvicted {
        room: RoomName,
        members: Vec<ClientAddress>,
    },

    /// The room list changed; every known client gets the new snapshot.
    RoomsChanged {
        change: RoomChange,
        rooms: Vec<RoomName>,
        recipients: Vec<ClientAddress>,
    },
}

/// What changed the room list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomChange {
    Created(RoomName),
    Destroyed(RoomName),
}

impl std::fmt::Display for RoomChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created(room) => write!(f, "room '{room}' created"),
            Self::Destroyed(room) => write!(f, "room '{room}' destroyed"),
        }
    }
}
