//! End-to-end tests for the UDP relay.
//!
//! Each test binds a `ChatServer` on an ephemeral loopback port and drives
//! it with plain `UdpSocket` clients speaking the wire protocol. Admin
//! actions go through `admin::execute`, exactly as the console does.
//!
//! Every request waits for its reply before the next datagram is sent:
//! datagrams are handled concurrently, so unpaced requests may be
//! answered in any order.

use std::net::SocketAddr;
use std::time::Duration;

use roomcast_core::RoomName;
use roomcast_protocol::{decode, encode, WireMessage};
use roomcastd::admin::{execute, AdminCommand};
use roomcastd::registry::{spawn_registry, RegistryHandle};
use roomcastd::server::ChatServer;
use tokio::net::UdpSocket;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

// ============================================================================
// Test Helpers
// ============================================================================

const RECV_TIMEOUT: Duration = Duration::from_secs(2);
const SILENCE_WINDOW: Duration = Duration::from_millis(200);

/// A running relay on 127.0.0.1 with its registry.
struct TestServer {
    addr: SocketAddr,
    registry: RegistryHandle,
    cancel: CancellationToken,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(256).await
    }

    async fn start_with(max_in_flight: usize) -> Self {
        let registry = spawn_registry();
        let cancel = CancellationToken::new();
        let server = ChatServer::bind(
            "127.0.0.1:0".parse().unwrap(),
            registry.clone(),
            cancel.clone(),
            max_in_flight,
        )
        .await
        .expect("bind");
        let addr = server.local_addr().expect("local addr");
        tokio::spawn(server.run());

        Self {
            addr,
            registry,
            cancel,
        }
    }

    async fn admin(&self, line: &str) -> String {
        let command = AdminCommand::parse(line)
            .expect("valid command")
            .expect("non-blank command");
        execute(&self.registry, command).await
    }

    async fn client(&self) -> TestClient {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        socket.connect(self.addr).await.unwrap();
        TestClient { socket }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct TestClient {
    socket: UdpSocket,
}

impl TestClient {
    async fn send(&self, message: &WireMessage) {
        let bytes = encode(message).unwrap();
        self.socket.send(&bytes).await.unwrap();
    }

    async fn send_raw(&self, bytes: &[u8]) {
        self.socket.send(bytes).await.unwrap();
    }

    async fn recv(&self) -> WireMessage {
        let mut buf = vec![0u8; 2048];
        let len = timeout(RECV_TIMEOUT, self.socket.recv(&mut buf))
            .await
            .expect("timed out waiting for a datagram")
            .unwrap();
        decode(&buf[..len]).expect("server datagram should decode")
    }

    async fn request(&self, message: &WireMessage) -> WireMessage {
        self.send(message).await;
        self.recv().await
    }

    async fn expect_silence(&self) {
        let mut buf = vec![0u8; 2048];
        // A refused-port error on a connected socket still means nothing arrived
        if let Ok(Ok(len)) = timeout(SILENCE_WINDOW, self.socket.recv(&mut buf)).await {
            panic!("expected no datagram, got {:?}", decode(&buf[..len]));
        }
    }

    async fn register(&self, name: &str) -> WireMessage {
        self.request(&WireMessage::register(name)).await
    }
}

fn rooms(names: &[&str]) -> WireMessage {
    WireMessage::rooms_update(names.iter().map(|n| RoomName::new(*n)).collect())
}

fn general() -> RoomName {
    RoomName::new("general")
}

// ============================================================================
// End-to-End Scenario
// ============================================================================

#[tokio::test]
async fn test_full_room_lifecycle_scenario() {
    let server = TestServer::start().await;
    assert_eq!(server.admin("add general").await, "Room 'general' added.");

    let alice = server.client().await;
    assert_eq!(alice.register("alice").await, rooms(&["general"]));
    assert_eq!(
        alice.request(&WireMessage::join("general")).await,
        WireMessage::joined(general(), "Joined room 'general'.")
    );

    let bob = server.client().await;
    assert_eq!(bob.register("bob").await, rooms(&["general"]));
    assert_eq!(
        bob.request(&WireMessage::join("general")).await,
        WireMessage::joined(general(), "Joined room 'general'.")
    );

    bob.send(&WireMessage::chat("general", "hi")).await;
    match alice.recv().await {
        WireMessage::Chat { room, message } => {
            assert_eq!(room, general());
            assert!(message.starts_with('['), "got {message:?}");
            assert!(message.ends_with("] bob: hi"), "got {message:?}");
        }
        other => panic!("expected chat line, got {other:?}"),
    }
    bob.expect_silence().await;

    assert_eq!(server.admin("remove general").await, "Room 'general' removed.");
    for client in [&alice, &bob] {
        assert_eq!(
            client.recv().await,
            WireMessage::left(general(), "Room has been deleted.")
        );
        assert_eq!(client.recv().await, rooms(&[]));
    }
}

// ============================================================================
// Requests and Replies
// ============================================================================

#[tokio::test]
async fn test_repeat_join_and_leave_notices() {
    let server = TestServer::start().await;
    server.admin("add general").await;
    let client = server.client().await;

    let join = WireMessage::join("general");
    client.request(&join).await;
    assert_eq!(
        client.request(&join).await,
        WireMessage::joined(general(), "Already in room 'general'.")
    );

    let leave = WireMessage::leave("general");
    assert_eq!(
        client.request(&leave).await,
        WireMessage::left(general(), "Left room 'general'.")
    );
    assert_eq!(
        client.request(&leave).await,
        WireMessage::left(general(), "Not in room 'general'.")
    );
}

#[tokio::test]
async fn test_unknown_room_errors_for_join_and_leave() {
    let server = TestServer::start().await;
    let client = server.client().await;

    assert_eq!(
        client.request(&WireMessage::join("nowhere")).await,
        WireMessage::error("Room 'nowhere' does not exist.")
    );
    assert_eq!(
        client.request(&WireMessage::leave("nowhere")).await,
        WireMessage::error("Room 'nowhere' does not exist.")
    );
}

#[tokio::test]
async fn test_post_to_unknown_room_is_silent() {
    let server = TestServer::start().await;
    let client = server.client().await;

    client.send(&WireMessage::chat("nowhere", "hello?")).await;
    client.expect_silence().await;
}

#[tokio::test]
async fn test_rooms_update_request_polls_sorted_list() {
    let server = TestServer::start().await;
    server.admin("add zeta").await;
    server.admin("add alpha").await;
    let client = server.client().await;

    assert_eq!(
        client.request(&WireMessage::rooms_update_request()).await,
        rooms(&["alpha", "zeta"])
    );
}

#[tokio::test]
async fn test_unregistered_sender_is_unknown() {
    let server = TestServer::start().await;
    server.admin("add general").await;
    let listener = server.client().await;
    let anon = server.client().await;

    listener.request(&WireMessage::join("general")).await;
    anon.request(&WireMessage::join("general")).await;
    anon.send(&WireMessage::chat("general", "who am I")).await;

    match listener.recv().await {
        WireMessage::Chat { message, .. } => assert!(message.ends_with("] Unknown: who am I")),
        other => panic!("expected chat line, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reregistration_renames_sender() {
    let server = TestServer::start().await;
    server.admin("add general").await;
    let listener = server.client().await;
    let speaker = server.client().await;

    listener.request(&WireMessage::join("general")).await;
    speaker.register("bob").await;
    speaker.request(&WireMessage::join("general")).await;
    speaker.register("robert").await;
    speaker.send(&WireMessage::chat("general", "new name")).await;

    match listener.recv().await {
        WireMessage::Chat { message, .. } => assert!(message.ends_with("] robert: new name")),
        other => panic!("expected chat line, got {other:?}"),
    }
}

// ============================================================================
// Broadcasts
// ============================================================================

#[tokio::test]
async fn test_room_creation_broadcasts_to_registered_clients() {
    let server = TestServer::start().await;
    let registered = server.client().await;
    let anonymous = server.client().await;

    assert_eq!(registered.register("alice").await, rooms(&[]));
    // Joining an unknown room gives the anonymous client a reply, not a registration
    anonymous.request(&WireMessage::join("general")).await;

    server.admin("add general").await;
    assert_eq!(registered.recv().await, rooms(&["general"]));
    anonymous.expect_silence().await;
}

#[tokio::test]
async fn test_duplicate_room_does_not_broadcast() {
    let server = TestServer::start().await;
    server.admin("add general").await;
    let client = server.client().await;
    client.register("alice").await;

    assert_eq!(server.admin("add general").await, "Room 'general' already exists.");
    client.expect_silence().await;
}

#[tokio::test]
async fn test_multi_room_membership_is_independent() {
    let server = TestServer::start().await;
    server.admin("add a").await;
    server.admin("add b").await;
    let listener = server.client().await;
    let speaker = server.client().await;

    for room in ["a", "b"] {
        listener.request(&WireMessage::join(room)).await;
        speaker.request(&WireMessage::join(room)).await;
    }
    speaker.request(&WireMessage::leave("a")).await;

    speaker.send(&WireMessage::chat("b", "still here")).await;
    match listener.recv().await {
        WireMessage::Chat { room, .. } => assert_eq!(room, RoomName::new("b")),
        other => panic!("expected chat line, got {other:?}"),
    }

    // The speaker left `a`, so removing it only evicts the listener
    server.admin("remove a").await;
    assert_eq!(
        listener.recv().await,
        WireMessage::left(RoomName::new("a"), "Room has been deleted.")
    );
    speaker.expect_silence().await;
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn test_cancelled_server_stops_answering() {
    let server = TestServer::start().await;
    let client = server.client().await;
    client.request(&WireMessage::rooms_update_request()).await;

    server.cancel.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;

    client.send(&WireMessage::rooms_update_request()).await;
    client.expect_silence().await;
}
