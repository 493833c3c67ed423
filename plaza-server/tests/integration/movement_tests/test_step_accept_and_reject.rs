use plaza_core::{ClientMessage, GridPosition, ServerMessage, UserId};

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer, recv_n};

#[tokio::test]
async fn test_accepted_step_is_broadcast_and_jump_is_rejected() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut a = TestClient::connect(&server.ws_url()).await.expect("connect a");
    let mut b = TestClient::connect(&server.ws_url()).await.expect("connect b");

    // A 1x1 room pins both spawns to (0, 0).
    a.join("tiny", server.token_for("a")).await.expect("join a");
    b.join("tiny", server.token_for("b")).await.expect("join b");
    a.recv().await.expect("ParticipantJoined(b)");

    // Put A at (3, 4) and B at (4, 4), one legal step at a time.
    let origin = GridPosition::new(0, 0);
    let a_at = a.walk(origin, GridPosition::new(3, 4)).await.expect("walk a");
    recv_n(&mut b, 4).await.expect("A's steps");
    let b_at = b.walk(origin, GridPosition::new(4, 4)).await.expect("walk b");
    recv_n(&mut a, 4).await.expect("B's steps");
    assert_eq!((a_at, b_at), (GridPosition::new(3, 4), GridPosition::new(4, 4)));

    b.send(&ClientMessage::Move { x: 4, y: 5 }).await.expect("move");
    assert_eq!(
        a.recv().await.expect("movement"),
        ServerMessage::Movement {
            user_id: UserId::from("b"),
            x: 4,
            y: 5
        }
    );

    b.send(&ClientMessage::Move { x: 9, y: 9 }).await.expect("jump");
    assert_eq!(
        b.recv().await.expect("rejection"),
        ServerMessage::MovementRejected { x: 4, y: 5 }
    );
    a.expect_silence().await.expect("A must not hear the rejected move");
}
