use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

#[tokio::test]
async fn test_lobby_reports_participants() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut a = TestClient::connect(&server.ws_url()).await.expect("connect a");
    a.join("r1", server.token_for("alice")).await.expect("join");

    let value = server
        .get_json("/rooms/r1/participants")
        .await
        .expect("lobby query");

    assert_eq!(value["roomId"], "r1");
    assert_eq!(value["count"], 1);
    assert_eq!(value["participants"][0]["userId"], "alice");
    assert_eq!(value["participants"][0]["username"], "alice name");
    assert_eq!(value["participants"][0]["avatarUrl"], "/avatars/alice.png");

    let value = server
        .get_json("/rooms/nowhere/participants")
        .await
        .expect("lobby query");
    assert_eq!(value["count"], 0);
}
