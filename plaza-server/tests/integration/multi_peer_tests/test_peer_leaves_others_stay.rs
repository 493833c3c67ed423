use plaza_core::{RoomId, ServerMessage, UserId};

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

#[tokio::test]
async fn test_peer_leaves_others_stay() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let url = server.ws_url();

    let mut a = TestClient::connect(&url).await.expect("connect a");
    let mut b = TestClient::connect(&url).await.expect("connect b");
    let mut c = TestClient::connect(&url).await.expect("connect c");

    a.join("r1", server.token_for("a")).await.expect("join a");
    b.join("r1", server.token_for("b")).await.expect("join b");
    a.recv().await.expect("a sees b");
    let reply = c.join("r1", server.token_for("c")).await.expect("join c");
    a.recv().await.expect("a sees c");
    b.recv().await.expect("b sees c");

    let ServerMessage::SpaceJoined { users, .. } = reply else {
        unreachable!();
    };
    let mut seen: Vec<UserId> = users.into_iter().map(|m| m.user_id).collect();
    seen.sort();
    assert_eq!(seen, vec![UserId::from("a"), UserId::from("b")]);

    c.close().await.expect("close c");

    let left = ServerMessage::ParticipantLeft {
        user_id: UserId::from("c"),
    };
    assert_eq!(a.recv().await.expect("a leave notice"), left);
    assert_eq!(b.recv().await.expect("b leave notice"), left);
    a.expect_silence().await.expect("exactly one notice for a");
    b.expect_silence().await.expect("exactly one notice for b");

    let members = server.gateway.registry().list_members(&RoomId::from("r1"));
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.user_id != UserId::from("c")));
}

#[tokio::test]
async fn test_dropped_socket_triggers_leave() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let url = server.ws_url();

    let mut a = TestClient::connect(&url).await.expect("connect a");
    let mut b = TestClient::connect(&url).await.expect("connect b");
    a.join("r1", server.token_for("a")).await.expect("join a");
    b.join("r1", server.token_for("b")).await.expect("join b");
    a.recv().await.expect("a sees b");

    // No close handshake, just the transport going away.
    drop(b);

    assert_eq!(
        a.recv().await.expect("leave notice"),
        ServerMessage::ParticipantLeft {
            user_id: UserId::from("b")
        }
    );
}
