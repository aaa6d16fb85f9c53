//! roomcast core - shared domain types for the room relay
//!
//! This crate provides the domain types shared between the wire
//! protocol (`roomcast-protocol`) and the server (`roomcastd`).
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod chat;
pub mod client;
pub mod error;
pub mod room;

// Re-exports for convenience
pub use chat::{ChatLine, UNKNOWN_SENDER};
pub use client::{Client, ClientAddress};
pub use error::{DomainError, DomainResult};
pub use room::{JoinOutcome, LeaveOutcome, Room, RoomName, ROOM_DELETED_NOTICE};
