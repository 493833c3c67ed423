use plaza_core::{ClientMessage, UserId};

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

#[tokio::test]
async fn test_message_before_join_is_ignored() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = TestClient::connect(&server.ws_url())
        .await
        .expect("Failed to connect");

    client
        .send(&ClientMessage::Move { x: 1, y: 1 })
        .await
        .expect("Send failed");
    client
        .send_raw(r#"{"type":"Teleport","payload":{}}"#.to_string())
        .await
        .expect("Send failed");
    client
        .send_raw("not even json".to_string())
        .await
        .expect("Send failed");
    client.expect_silence().await.expect("Server replied");

    // The connection is still usable for a proper join.
    client
        .join("r1", server.token_for("bob"))
        .await
        .expect("Join after ignored messages failed");

    let members = server
        .gateway
        .registry()
        .list_members(&plaza_core::RoomId::from("r1"));
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].user_id, UserId::from("bob"));
}
