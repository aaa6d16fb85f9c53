//! Line-mode admin console.
//!
//! Rooms are created and destroyed out of band, by an operator typing
//! commands on the server's terminal:
//!
//! ```text
//! add <room>      create a room (broadcasts the new room list)
//! remove <room>   destroy a room (evicts members, broadcasts)
//! list            print the current rooms
//! ```
//!
//! Results are printed to the console only; clients see the broadcast
//! fan-out, never the console replies.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use roomcast_core::RoomName;

use crate::registry::{RegistryError, RegistryHandle};

/// Prompt printed before each command.
pub const PROMPT: &str = "Enter command (add <room>, remove <room>, list): ";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminCommand {
    Add(RoomName),
    Remove(RoomName),
    List,
}

/// A console line that is not a valid command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid command")]
pub struct InvalidCommand;

impl AdminCommand {
    /// Parses one console line.
    ///
    /// Returns `Ok(None)` for blank lines. `add`/`remove` take exactly one
    /// room name; words after `list` are ignored.
    pub fn parse(line: &str) -> Result<Option<Self>, InvalidCommand> {
        let mut parts = line.split_whitespace();
        let Some(cmd) = parts.next() else {
            return Ok(None);
        };
        let arg = parts.next();
        let extra = parts.next();

        match (cmd, arg, extra) {
            ("add", Some(room), None) => Ok(Some(Self::Add(RoomName::new(room)))),
            ("remove", Some(room), None) => Ok(Some(Self::Remove(RoomName::new(room)))),
            ("list", _, _) => Ok(Some(Self::List)),
            _ => Err(InvalidCommand),
        }
    }
}

/// Executes one command against the registry and renders the console reply.
pub async fn execute(registry: &RegistryHandle, command: AdminCommand) -> String {
    match command {
        AdminCommand::Add(room) => match registry.create_room(room.clone()).await {
            Ok(()) => {
                info!(room = %room, "Room added by admin");
                format!("Room '{room}' added.")
            }
            Err(e) => failure(e),
        },
        AdminCommand::Remove(room) => match registry.destroy_room(room.clone()).await {
            Ok(evicted) => {
                info!(room = %room, evicted = evicted.len(), "Room removed by admin");
                format!("Room '{room}' removed.")
            }
            Err(e) => failure(e),
        },
        AdminCommand::List => {
            let mut out = String::from("Rooms:");
            for room in registry.list_rooms().await {
                out.push_str("\n - ");
                out.push_str(room.as_str());
            }
            out
        }
    }
}

fn failure(err: RegistryError) -> String {
    warn!(error = %err, "Admin command failed");
    err.to_string()
}

/// Runs the console until EOF or cancellation.
///
/// Generic over the streams so it can be driven by stdin/stdout or by
/// in-memory buffers in tests.
pub async fn run_console<R, W>(
    reader: R,
    mut writer: W,
    registry: RegistryHandle,
    cancel_token: CancellationToken,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();

    loop {
        writer.write_all(PROMPT.as_bytes()).await?;
        writer.flush().await?;

        let line = tokio::select! {
            _ = cancel_token.cancelled() => break,
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            debug!("Admin console reached EOF");
            break;
        };

        let reply = match AdminCommand::parse(&line) {
            Ok(Some(command)) => execute(&registry, command).await,
            Ok(None) => continue,
            Err(e) => e.to_string(),
        };

        writer.write_all(reply.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    writer.flush().await
}
