//! Room entities and membership outcomes.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{ClientAddress, DomainError};

/// Notice sent to every member of a room when the room is destroyed.
pub const ROOM_DELETED_NOTICE: &str = "Room has been deleted.";

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Name of a chat room.
///
/// Room names are compared byte-for-byte: `General` and `general`
/// are two different rooms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(String);

impl RoomName {
    /// Creates a new RoomName from a string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the name and returns the owned string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RoomName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RoomName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RoomName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Membership Outcomes
// ============================================================================

/// Result of a join request.
///
/// `AlreadyMember` is not a failure: it is reported to the client with
/// the same message kind as a fresh join, only the text differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    RoomNotFound,
}

impl JoinOutcome {
    /// Human-readable notice for the requesting client.
    pub fn notice(&self, room: &RoomName) -> String {
        match self {
            Self::Joined => format!("Joined room '{room}'."),
            Self::AlreadyMember => format!("Already in room '{room}'."),
            Self::RoomNotFound => DomainError::RoomNotFound { room: room.clone() }.to_string(),
        }
    }
}

/// Result of a leave request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left,
    NotMember,
    RoomNotFound,
}

impl LeaveOutcome {
    /// Human-readable notice for the requesting client.
    pub fn notice(&self, room: &RoomName) -> String {
        match self {
            Self::Left => format!("Left room '{room}'."),
            Self::NotMember => format!("Not in room '{room}'."),
            Self::RoomNotFound => DomainError::RoomNotFound { room: room.clone() }.to_string(),
        }
    }
}

// ============================================================================
// Room
// ============================================================================

/// A named set of member addresses.
///
/// Membership is a set: joining twice never produces a duplicate entry.
/// A member does not need a registered client entry.
#[derive(Debug, Clone)]
pub struct Room {
    name: RoomName,
    members: HashSet<ClientAddress>,
}

impl Room {
    /// Creates an empty room.
    pub fn new(name: RoomName) -> Self {
        Self {
            name,
            members: HashSet::new(),
        }
    }

    pub fn name(&self) -> &RoomName {
        &self.name
    }

    /// Adds a member. Never returns `RoomNotFound`.
    pub fn join(&mut self, addr: ClientAddress) -> JoinOutcome {
        if self.members.insert(addr) {
            JoinOutcome::Joined
        } else {
            JoinOutcome::AlreadyMember
        }
    }

    /// Removes a member. Never returns `RoomNotFound`.
    pub fn leave(&mut self, addr: &ClientAddress) -> LeaveOutcome {
        if self.members.remove(addr) {
            LeaveOutcome::Left
        } else {
            LeaveOutcome::NotMember
        }
    }

    #[must_use]
    pub fn contains(&self, addr: &ClientAddress) -> bool {
        self.members.contains(addr)
    }

    /// Iterates every member except `sender`.
    pub fn others<'a>(
        &'a self,
        sender: &'a ClientAddress,
    ) -> impl Iterator<Item = &'a ClientAddress> + 'a {
        self.members.iter().filter(move |addr| *addr != sender)
    }

    pub fn members(&self) -> impl Iterator<Item = &ClientAddress> {
        self.members.iter()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Consumes the room, returning its former members.
    pub fn into_members(self) -> Vec<ClientAddress> {
        self.members.into_iter().collect()
    }
}
