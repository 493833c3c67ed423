use plaza_core::{ServerMessage, UserId};

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

#[tokio::test]
async fn test_single_peer_joins_room() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = TestClient::connect(&server.ws_url())
        .await
        .expect("Failed to connect");

    let reply = client
        .join("r1", server.token_for("alice"))
        .await
        .expect("Join failed");

    let ServerMessage::SpaceJoined { spawn, user_id, users } = reply else {
        unreachable!();
    };
    assert_eq!(user_id, UserId::from("alice"));
    assert!(users.is_empty());
    assert!((0..20).contains(&spawn.x));
    assert!((0..15).contains(&spawn.y));

    client.close().await.expect("Failed to close");
}
