//! roomcast protocol - datagram wire format
//!
//! Every datagram carries one JSON object with a string `type` field.
//! Client requests and server replies share a single schema, so anything
//! the server sends can be decoded with the same decoder it uses for
//! incoming traffic.

pub mod codec;
pub mod message;

pub use codec::{decode, encode, DecodeError, MAX_DATAGRAM_SIZE};
pub use message::{MessageKind, WireMessage};
