//! Domain-specific error types following panic-free policy.
//!
//! The `Display` text of each variant is human-readable and is sent
//! verbatim to clients or printed on the admin console.

use crate::RoomName;
use thiserror::Error;

/// Errors that can occur in room operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The named room is not known to the registry
    #[error("Room '{room}' does not exist.")]
    RoomNotFound { room: RoomName },

    /// A room with this name already exists
    #[error("Room '{room}' already exists.")]
    RoomExists { room: RoomName },
}

impl DomainError {
    /// Returns the room the error refers to.
    pub fn room(&self) -> &RoomName {
        match self {
            Self::RoomNotFound { room } | Self::RoomExists { room } => room,
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
