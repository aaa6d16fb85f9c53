//! Protocol message types.

use roomcast_core::{ChatLine, RoomName};
use serde::{Deserialize, Serialize};

/// A single datagram payload.
///
/// The `type` tag selects the variant. `join`, `leave` and `message` are
/// used in both directions: requests from clients carry only the room
/// (plus text for `message`), replies from the server add a
/// human-readable `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// Set or replace the sender's display name
    Register { username: String },

    /// Poll for the current room list
    RoomsUpdateRequest,

    /// Membership request (client) or confirmation (server)
    Join {
        room: RoomName,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Removal request (client) or confirmation/forced-removal notice (server)
    Leave {
        room: RoomName,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },

    /// Text posted to a room (client) or relayed chat line (server)
    #[serde(rename = "message")]
    Chat { room: RoomName, message: String },

    /// Authoritative room-name snapshot
    RoomsUpdate { rooms: Vec<RoomName> },

    /// Human-readable error
    Error { message: String },
}

/// Discriminator of a [`WireMessage`], without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Register,
    RoomsUpdateRequest,
    Join,
    Leave,
    Chat,
    RoomsUpdate,
    Error,
}

impl MessageKind {
    /// Every `type` tag the protocol defines.
    pub const ALL: [MessageKind; 7] = [
        Self::Register,
        Self::RoomsUpdateRequest,
        Self::Join,
        Self::Leave,
        Self::Chat,
        Self::RoomsUpdate,
        Self::Error,
    ];

    /// The value of the `type` field on the wire.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Register => "register",
            Self::RoomsUpdateRequest => "rooms_update_request",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Chat => "message",
            Self::RoomsUpdate => "rooms_update",
            Self::Error => "error",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Returns true for kinds a client may send.
    ///
    /// `rooms_update` and `error` only flow from server to client.
    #[must_use]
    pub fn is_request(&self) -> bool {
        !matches!(self, Self::RoomsUpdate | Self::Error)
    }
}

impl WireMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::Register { .. } => MessageKind::Register,
            Self::RoomsUpdateRequest => MessageKind::RoomsUpdateRequest,
            Self::Join { .. } => MessageKind::Join,
            Self::Leave { .. } => MessageKind::Leave,
            Self::Chat { .. } => MessageKind::Chat,
            Self::RoomsUpdate { .. } => MessageKind::RoomsUpdate,
            Self::Error { .. } => MessageKind::Error,
        }
    }

    // ------------------------------------------------------------------------
    // Client requests
    // ------------------------------------------------------------------------

    /// Creates a register request.
    pub fn register(username: impl Into<String>) -> Self {
        Self::Register {
            username: username.into(),
        }
    }

    /// Creates a room-list poll.
    pub fn rooms_update_request() -> Self {
        Self::RoomsUpdateRequest
    }

    /// Creates a join request.
    pub fn join(room: impl Into<RoomName>) -> Self {
        Self::Join {
            room: room.into(),
            message: None,
        }
    }

    /// Creates a leave request.
    pub fn leave(room: impl Into<RoomName>) -> Self {
        Self::Leave {
            room: room.into(),
            message: None,
        }
    }

    /// Creates a chat post.
    pub fn chat(room: impl Into<RoomName>, text: impl Into<String>) -> Self {
        Self::Chat {
            room: room.into(),
            message: text.into(),
        }
    }

    // ------------------------------------------------------------------------
    // Server replies
    // ------------------------------------------------------------------------

    /// Creates a join confirmation or duplicate notice.
    pub fn joined(room: RoomName, notice: impl Into<String>) -> Self {
        Self::Join {
            room,
            message: Some(notice.into()),
        }
    }

    /// Creates a leave confirmation, duplicate notice or forced-removal notice.
    pub fn left(room: RoomName, notice: impl Into<String>) -> Self {
        Self::Leave {
            room,
            message: Some(notice.into()),
        }
    }

    /// Creates a relayed chat line.
    pub fn relayed(room: RoomName, line: &ChatLine) -> Self {
        Self::Chat {
            room,
            message: line.to_string(),
        }
    }

    /// Creates a room-list snapshot.
    pub fn rooms_update(rooms: Vec<RoomName>) -> Self {
        Self::RoomsUpdate { rooms }
    }

    /// Creates an error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
