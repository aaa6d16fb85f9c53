//! Client interface for interacting with the RegistryActor.
//!
//! The `RegistryHandle` provides a cheap-to-clone interface for sending commands
//! to the registry actor and subscribing to room events. The router, the
//! admin console and the tests all go through it; nothing else can reach
//! the actor's maps.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `RegistryError::ChannelClosed`

use tokio::sync::{mpsc, oneshot};

use roomcast_core::{ClientAddress, JoinOutcome, LeaveOutcome, RoomName};

use super::commands::{Deliveries, RegistryCommand, RegistryError, RoomEvent};

// ============================================================================
// Registry Handle
// ============================================================================

/// Handle for interacting with the registry actor.
///
/// This is a cheap-to-clone handle that can be shared across tasks.
/// All methods are async and communicate with the actor via channels.
///
/// # Usage
///
/// ```ignore
/// let handle = registry_handle.clone();
///
/// handle.create_room(RoomName::new("general")).await?;
/// let outcome = handle.join_room(RoomName::new("general"), addr).await?;
///
/// let mut rx = handle.subscribe().await?;
/// while let Some(event) = rx.recv().await {
///     // Fan the event out
/// }
/// ```
#[derive(Clone)]
pub struct RegistryHandle {
    /// Command sender to the actor
    sender: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Create a new registry handle.
    ///
    /// # Arguments
    ///
    /// * `sender` - The command channel sender for communicating with the actor
    pub fn new(sender: mpsc::Sender<RegistryCommand>) -> Self {
        Self { sender }
    }

    /// Sends a command and waits for the actor's reply.
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T, RegistryError> {
        let (tx, rx) = oneshot::channel();

        self.sender
            .send(build(tx))
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;

        rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Register a client, or rename it if already known.
    ///
    /// Returns the current room list.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn register_client(
        &self,
        addr: ClientAddress,
        display_name: impl Into<String>,
    ) -> Result<Vec<RoomName>, RegistryError> {
        let display_name = display_name.into();
        self.request(|respond_to| RegistryCommand::RegisterClient {
            addr,
            display_name,
            respond_to,
        })
        .await
    }

    /// Create an empty room.
    ///
    /// On success the registry publishes a `RoomsChanged` event.
    ///
    /// # Errors
    ///
    /// - `DomainError::RoomExists` if the name is taken
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn create_room(&self, room: RoomName) -> Result<(), RegistryError> {
        self.request(|respond_to| RegistryCommand::CreateRoom { room, respond_to })
            .await?
    }

    /// Destroy a room and return its former members.
    ///
    /// On success the registry publishes `MembersEvicted` then `RoomsChanged`.
    ///
    /// # Errors
    ///
    /// - `DomainError::RoomNotFound` if the room doesn't exist
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn destroy_room(&self, room: RoomName) -> Result<Vec<ClientAddress>, RegistryError> {
        self.request(|respond_to| RegistryCommand::DestroyRoom { room, respond_to })
            .await?
    }

    /// Get the current room names.
    ///
    /// Returns an empty vector if communication with the actor fails.
    pub async fn list_rooms(&self) -> Vec<RoomName> {
        self.request(|respond_to| RegistryCommand::ListRooms { respond_to })
            .await
            .unwrap_or_default()
    }

    /// Add `addr` to `room`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn join_room(
        &self,
        room: RoomName,
        addr: ClientAddress,
    ) -> Result<JoinOutcome, RegistryError> {
        self.request(|respond_to| RegistryCommand::JoinRoom {
            room,
            addr,
            respond_to,
        })
        .await
    }

    /// Remove `addr` from `room`.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn leave_room(
        &self,
        room: RoomName,
        addr: ClientAddress,
    ) -> Result<LeaveOutcome, RegistryError> {
        self.request(|respond_to| RegistryCommand::LeaveRoom {
            room,
            addr,
            respond_to,
        })
        .await
    }

    /// Render a chat line for every member of `room` except `sender`.
    ///
    /// # Errors
    ///
    /// - `DomainError::RoomNotFound` if the room doesn't exist
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn route_message(
        &self,
        room: RoomName,
        text: impl Into<String>,
        sender: ClientAddress,
    ) -> Result<Deliveries, RegistryError> {
        let text = text.into();
        self.request(|respond_to| RegistryCommand::RouteMessage {
            room,
            text,
            sender,
            respond_to,
        })
        .await?
    }

    /// Get the members of a room.
    ///
    /// Returns `None` if the room doesn't exist or if communication
    /// with the actor fails.
    pub async fn members(&self, room: RoomName) -> Option<Vec<ClientAddress>> {
        self.request(|respond_to| RegistryCommand::GetMembers { room, respond_to })
            .await
            .ok()?
    }

    /// Get a client's registered display name.
    ///
    /// Returns `None` for unregistered (or expired) clients and if
    /// communication with the actor fails.
    pub async fn display_name(&self, addr: ClientAddress) -> Option<String> {
        self.request(|respond_to| RegistryCommand::GetDisplayName { addr, respond_to })
            .await
            .ok()?
    }

    /// Record activity from `addr`.
    ///
    /// This is a fire-and-forget operation.
    pub async fn touch(&self, addr: ClientAddress) {
        // Fire-and-forget: ignore send errors (actor may be shutting down)
        let _ = self.sender.send(RegistryCommand::Touch { addr }).await;
    }

    /// Trigger expiry of stale clients.
    ///
    /// This is a fire-and-forget operation - it does not wait for
    /// the cleanup to complete or return any result.
    pub async fn cleanup_stale(&self) {
        let _ = self.sender.send(RegistryCommand::CleanupStale).await;
    }

    /// Subscribe to room events.
    ///
    /// The subscription is queued behind every command this handle has
    /// already sent, and covers every event published after it. Nothing is
    /// skipped however far the receiver falls behind.
    ///
    /// # Errors
    ///
    /// - `RegistryError::ChannelClosed` if the actor has shut down
    pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<RoomEvent>, RegistryError> {
        let (subscriber, events) = mpsc::unbounded_channel();
        self.sender
            .send(RegistryCommand::Subscribe { subscriber })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;
        Ok(events)
    }

    /// Check if the actor is still running.
    ///
    /// Returns `true` if the command channel is still open.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;

    fn create_test_handle() -> (RegistryHandle, mpsc::Receiver<RegistryCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let handle = RegistryHandle::new(cmd_tx);
        (handle, cmd_rx)
    }

    fn addr() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 5555))
    }

    #[tokio::test]
    async fn test_join_room_sends_command() {
        let (handle, mut rx) = create_test_handle();

        let cmd_handler = tokio::spawn(async move {
            if let Some(RegistryCommand::JoinRoom {
                room,
                addr: a,
                respond_to,
            }) = rx.recv().await
            {
                assert_eq!(room.as_str(), "general");
                assert_eq!(a, addr());
                let _ = respond_to.send(JoinOutcome::Joined);
                return true;
            }
            false
        });

        let result = handle.join_room(RoomName::new("general"), addr()).await;
        assert_eq!(result, Ok(JoinOutcome::Joined));
        assert!(cmd_handler.await.unwrap());
    }

    #[tokio::test]
    async fn test_create_room_flattens_actor_error() {
        let (handle, mut rx) = create_test_handle();

        tokio::spawn(async move {
            if let Some(RegistryCommand::CreateRoom { room, respond_to }) = rx.recv().await {
                let _ = respond_to.send(Err(RegistryError::room_exists(room)));
            }
        });

        let result = handle.create_room(RoomName::new("general")).await;
        assert_eq!(
            result,
            Err(RegistryError::room_exists(RoomName::new("general")))
        );
    }

    #[tokio::test]
    async fn test_register_channel_closed_error() {
        let (handle, rx) = create_test_handle();
        drop(rx); // Close the channel

        let result = handle.register_client(addr(), "alice").await;
        assert_eq!(result, Err(RegistryError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_dropped_responder_maps_to_channel_closed() {
        let (handle, mut rx) = create_test_handle();

        tokio::spawn(async move {
            // Receive and drop the responder without answering
            let _ = rx.recv().await;
        });

        let result = handle.leave_room(RoomName::new("general"), addr()).await;
        assert_eq!(result, Err(RegistryError::ChannelClosed));
    }

    #[tokio::test]
    async fn test_queries_degrade_on_channel_close() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        assert!(handle.list_rooms().await.is_empty());
        assert!(handle.members(RoomName::new("general")).await.is_none());
        assert!(handle.display_name(addr()).await.is_none());
    }

    #[tokio::test]
    async fn test_fire_and_forget_ignores_closed_channel() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        // Should not panic or error
        handle.touch(addr()).await;
        handle.cleanup_stale().await;
    }

    #[tokio::test]
    async fn test_subscribe_sends_command() {
        let (handle, mut rx) = create_test_handle();

        let mut events = handle.subscribe().await.unwrap();
        match rx.recv().await {
            Some(RegistryCommand::Subscribe { subscriber }) => {
                subscriber
                    .send(RoomEvent::MembersEvicted {
                        room: RoomName::new("general"),
                        members: vec![addr()],
                    })
                    .unwrap();
            }
            other => panic!("expected Subscribe, got {other:?}"),
        }
        assert!(matches!(
            events.recv().await,
            Some(RoomEvent::MembersEvicted { .. })
        ));
    }

    #[tokio::test]
    async fn test_subscribe_channel_closed_error() {
        let (handle, rx) = create_test_handle();
        drop(rx);

        assert_eq!(
            handle.subscribe().await.err(),
            Some(RegistryError::ChannelClosed)
        );
    }

    #[tokio::test]
    async fn test_is_connected() {
        let (handle, rx) = create_test_handle();

        assert!(handle.is_connected());

        drop(rx);
        assert!(!handle.is_connected());
    }
}
