//! Registry actor - owns all room and client state and processes commands.
//!
//! The RegistryActor is the single owner of the rooms map and the clients
//! map. It receives commands via an mpsc channel and publishes events to
//! each subscriber's unbounded channel. Operations that touch both maps (registration, room
//! destruction) therefore never observe a half-applied change.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel send failures are ignored or logged but don't panic

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info};

use roomcast_core::{
    ChatLine, Client, ClientAddress, JoinOutcome, LeaveOutcome, Room, RoomName,
};

use super::commands::{Deliveries, RegistryCommand, RegistryError, RoomChange, RoomEvent};

// ============================================================================
// Registry Actor
// ============================================================================

/// The registry actor - owns all room and client state.
///
/// Implements the actor pattern: receives commands via mpsc channel,
/// processes them sequentially, and publishes events to subscribers.
///
/// # Ownership
///
/// The actor owns:
/// - `rooms`: room name → members, ordered by name so snapshots are stable
/// - `clients`: address → registered client
///
/// A room member does not need an entry in `clients`; joining before
/// registering is allowed and the sender shows up as `Unknown`.
pub struct RegistryActor {
    /// Command receiver
    receiver: mpsc::Receiver<RegistryCommand>,

    rooms: BTreeMap<RoomName, Room>,

    clients: HashMap<ClientAddress, Client>,

    /// Silence after which a client is expired; `None` keeps clients forever
    client_ttl: Option<Duration>,

    /// Event subscribers (the server's broadcaster, tests)
    subscribers: Vec<mpsc::UnboundedSender<RoomEvent>>,
}

impl RegistryActor {
    /// Creates a new registry actor.
    ///
    /// # Arguments
    ///
    /// * `receiver` - Channel for receiving commands
    /// * `client_ttl` - Expiry for silent clients, `None` to disable
    pub fn new(receiver: mpsc::Receiver<RegistryCommand>, client_ttl: Option<Duration>) -> Self {
        Self {
            receiver,
            rooms: BTreeMap::new(),
            clients: HashMap::new(),
            client_ttl,
            subscribers: Vec::new(),
        }
    }

    /// Runs the actor event loop.
    ///
    /// Processes commands until the channel closes (all senders dropped).
    /// This is the main entry point - call this in a spawned task.
    pub async fn run(mut self) {
        info!("Registry actor starting");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd);
        }

        info!(
            rooms = self.rooms.len(),
            clients = self.clients.len(),
            "Registry actor stopped"
        );
    }

    /// Dispatches a command to the appropriate handler.
    fn handle_command(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::RegisterClient {
                addr,
                display_name,
                respond_to,
            } => {
                let result = self.handle_register_client(addr, display_name);
                // Ignore send error - caller may have dropped the receiver
                let _ = respond_to.send(result);
            }
            RegistryCommand::CreateRoom { room, respond_to } => {
                let result = self.handle_create_room(room);
                let _ = respond_to.send(result);
            }
            RegistryCommand::DestroyRoom { room, respond_to } => {
                let result = self.handle_destroy_room(room);
                let _ = respond_to.send(result);
            }
            RegistryCommand::ListRooms { respond_to } => {
                let _ = respond_to.send(self.room_names());
            }
            RegistryCommand::JoinRoom {
                room,
                addr,
                respond_to,
            } => {
                let result = self.handle_join_room(&room, addr);
                let _ = respond_to.send(result);
            }
            RegistryCommand::LeaveRoom {
                room,
                addr,
                respond_to,
            } => {
                let result = self.handle_leave_room(&room, addr);
                let _ = respond_to.send(result);
            }
            RegistryCommand::RouteMessage {
                room,
                text,
                sender,
                respond_to,
            } => {
                let result = self.handle_route_message(room, &text, sender);
                let _ = respond_to.send(result);
            }
            RegistryCommand::GetMembers { room, respond_to } => {
                let result = self
                    .rooms
                    .get(&room)
                    .map(|r| r.members().copied().collect());
                let _ = respond_to.send(result);
            }
            RegistryCommand::GetDisplayName { addr, respond_to } => {
                let result = self
                    .clients
                    .get(&addr)
                    .map(|c| c.display_name().to_string());
                let _ = respond_to.send(result);
            }
            RegistryCommand::Touch { addr } => {
                if let Some(client) = self.clients.get_mut(&addr) {
                    client.touch(now());
                }
            }
            RegistryCommand::CleanupStale => {
                self.handle_cleanup_stale();
            }
            RegistryCommand::Subscribe { subscriber } => {
                self.subscribers.push(subscriber);
                debug!(subscribers = self.subscribers.len(), "Event subscriber added");
            }
        }
    }

    // ========================================================================
    // Command Handlers
    // ========================================================================

    /// Upserts a client and returns the room list snapshot.
    ///
    /// Re-registration only changes the display name; memberships are untouched.
    fn handle_register_client(&mut self, addr: ClientAddress, display_name: String) -> Vec<RoomName> {
        match self.clients.get_mut(&addr) {
            Some(client) => {
                debug!(
                    client = %addr,
                    old_name = %client.display_name(),
                    new_name = %display_name,
                    "Client re-registered"
                );
                client.rename(display_name);
                client.touch(now());
            }
            None => {
                info!(
                    client = %addr,
                    name = %display_name,
                    total_clients = self.clients.len() + 1,
                    "Client registered"
                );
                self.clients
                    .insert(addr, Client::new(addr, display_name, now()));
            }
        }

        self.room_names()
    }

    fn handle_create_room(&mut self, room: RoomName) -> Result<(), RegistryError> {
        if self.rooms.contains_key(&room) {
            debug!(room = %room, "Room already exists, rejecting creation");
            return Err(RegistryError::room_exists(room));
        }

        self.rooms.insert(room.clone(), Room::new(room.clone()));
        info!(room = %room, total_rooms = self.rooms.len(), "Room created");

        self.publish_rooms_changed(RoomChange::Created(room));
        Ok(())
    }

    fn handle_destroy_room(&mut self, room: RoomName) -> Result<Vec<ClientAddress>, RegistryError> {
        let removed = match self.rooms.remove(&room) {
            Some(r) => r,
            None => {
                debug!(room = %room, "Room not found, rejecting destruction");
                return Err(RegistryError::room_not_found(room));
            }
        };

        let members = removed.into_members();
        info!(
            room = %room,
            evicted = members.len(),
            total_rooms = self.rooms.len(),
            "Room destroyed"
        );

        // Evictions go out before the new room list
        self.publish(RoomEvent::MembersEvicted {
            room: room.clone(),
            members: members.clone(),
        });
        self.publish_rooms_changed(RoomChange::Destroyed(room));

        Ok(members)
    }

    fn handle_join_room(&mut self, room: &RoomName, addr: ClientAddress) -> JoinOutcome {
        let Some(entry) = self.rooms.get_mut(room) else {
            debug!(room = %room, client = %addr, "Join for unknown room");
            return JoinOutcome::RoomNotFound;
        };

        let outcome = entry.join(addr);
        debug!(
            room = %room,
            client = %addr,
            outcome = ?outcome,
            members = entry.member_count(),
            "Join handled"
        );
        outcome
    }

    fn handle_leave_room(&mut self, room: &RoomName, addr: ClientAddress) -> LeaveOutcome {
        let Some(entry) = self.rooms.get_mut(room) else {
            debug!(room = %room, client = %addr, "Leave for unknown room");
            return LeaveOutcome::RoomNotFound;
        };

        let outcome = entry.leave(&addr);
        debug!(
            room = %room,
            client = %addr,
            outcome = ?outcome,
            members = entry.member_count(),
            "Leave handled"
        );
        outcome
    }

    /// Renders the chat line once and addresses it to every other member.
    ///
    /// The sender does not need to be a member of the room.
    fn handle_route_message(
        &self,
        room: RoomName,
        text: &str,
        sender: ClientAddress,
    ) -> Result<Deliveries, RegistryError> {
        let Some(entry) = self.rooms.get(&room) else {
            return Err(RegistryError::room_not_found(room));
        };

        let display_name = self.clients.get(&sender).map(Client::display_name);
        let line = ChatLine::now(display_name, text).to_string();

        let deliveries: Deliveries = entry
            .others(&sender)
            .map(|addr| (*addr, line.clone()))
            .collect();

        debug!(
            room = %room,
            sender = %sender,
            recipients = deliveries.len(),
            "Chat message routed"
        );

        Ok(deliveries)
    }

    /// Drops clients that have been silent longer than the TTL.
    ///
    /// Only the clients map is pruned. Room membership is left alone: an
    /// address stays a member until it leaves or its room is destroyed.
    fn handle_cleanup_stale(&mut self) {
        let Some(ttl) = self.client_ttl else {
            return;
        };

        let now = now();
        let before = self.clients.len();
        self.clients.retain(|addr, client| {
            let stale = client.is_stale(now, ttl);
            if stale {
                debug!(client = %addr, name = %client.display_name(), "Expiring stale client");
            }
            !stale
        });

        let expired = before - self.clients.len();
        if expired > 0 {
            info!(
                expired,
                remaining = self.clients.len(),
                "Stale clients expired"
            );
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn room_names(&self) -> Vec<RoomName> {
        self.rooms.keys().cloned().collect()
    }

    fn publish_rooms_changed(&mut self, change: RoomChange) {
        self.publish(RoomEvent::RoomsChanged {
            change,
            rooms: self.room_names(),
            recipients: self.clients.keys().copied().collect(),
        });
    }

    /// Sends `event` to every live subscriber, dropping closed ones.
    fn publish(&mut self, event: RoomEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    /// Returns the number of live event subscribers (for testing/monitoring).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Returns the number of rooms (for testing/monitoring).
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Returns the number of known clients (for testing/monitoring).
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}

/// Current time, following tokio's clock so paused-time tests apply.
fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}
