use plaza_core::{ClientMessage, RoomId};

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

#[tokio::test]
async fn test_invalid_token_closes_connection() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = TestClient::connect(&server.ws_url())
        .await
        .expect("Failed to connect");

    client
        .send(&ClientMessage::Join {
            room_id: RoomId::from("r1"),
            auth_token: "definitely-not-a-jwt".to_string(),
        })
        .await
        .expect("Send failed");

    assert!(client.closed_without_response().await);
}

#[tokio::test]
async fn test_unknown_room_closes_connection() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = TestClient::connect(&server.ws_url())
        .await
        .expect("Failed to connect");

    client
        .send(&ClientMessage::Join {
            room_id: RoomId::from("atlantis"),
            auth_token: server.token_for("alice"),
        })
        .await
        .expect("Send failed");

    assert!(client.closed_without_response().await);
    assert!(
        server
            .gateway
            .registry()
            .list_members(&RoomId::from("atlantis"))
            .is_empty()
    );
}
