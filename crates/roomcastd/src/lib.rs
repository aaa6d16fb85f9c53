//! roomcastd - room registry and UDP relay server
//!
//! This crate provides the server side of the roomcast chat relay:
//! - `registry` - Room/client registry actor (single owner of all state)
//! - `router` - Decodes a datagram and applies it to the registry
//! - `server` - UDP transport loop and event broadcaster
//! - `admin` - Line-mode console for creating and removing rooms
//! - `config` - Layered configuration (defaults, TOML, env, CLI)
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        roomcastd                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────┐     ┌─────────────────────────────┐   │
//! │  │   ChatServer    │────▶│        Router               │   │
//! │  │  (UDP socket)   │     │  (decode + dispatch)        │   │
//! │  └────────┬────────┘     └──────────────┬──────────────┘   │
//! │           ▲                             │                   │
//! │           │ datagrams                   ▼                   │
//! │  ┌────────┴────────┐     ┌─────────────────────────────┐   │
//! │  │  broadcaster    │◀────│     RegistryActor           │   │
//! │  │ (room events)   │     │  (rooms + clients owner)    │   │
//! │  └─────────────────┘     └──────────────▲──────────────┘   │
//! │                                         │                   │
//! │                          ┌──────────────┴──────────────┐   │
//! │                          │      admin console          │   │
//! │                          └─────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod admin;
pub mod config;
pub mod registry;
pub mod router;
pub mod server;
