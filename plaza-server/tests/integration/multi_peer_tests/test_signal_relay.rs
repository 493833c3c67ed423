use plaza_core::{ClientMessage, ServerMessage, UserId};
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{TestClient, TestServer};

#[tokio::test]
async fn test_offer_answer_and_candidates_are_relayed() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let url = server.ws_url();

    let mut a = TestClient::connect(&url).await.expect("connect a");
    let mut b = TestClient::connect(&url).await.expect("connect b");
    a.join("r1", server.token_for("a")).await.expect("join a");
    b.join("r1", server.token_for("b")).await.expect("join b");
    a.recv().await.expect("a sees b");

    let offer = json!({ "type": "offer", "sdp": "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\n" });
    a.send(&ClientMessage::Offer {
        target_user_id: UserId::from("b"),
        payload: offer.clone(),
    })
    .await
    .expect("send offer");
    assert_eq!(
        b.recv().await.expect("offer"),
        ServerMessage::Offer {
            user_id: UserId::from("a"),
            payload: offer
        }
    );

    let answer = json!({ "type": "answer", "sdp": "v=0\r\n" });
    b.send(&ClientMessage::Answer {
        target_user_id: UserId::from("a"),
        payload: answer.clone(),
    })
    .await
    .expect("send answer");
    assert_eq!(
        a.recv().await.expect("answer"),
        ServerMessage::Answer {
            user_id: UserId::from("b"),
            payload: answer
        }
    );

    let candidate = json!({ "candidate": "candidate:0 1 UDP 2122 192.168.1.2 5000 typ host", "sdpMLineIndex": 0 });
    b.send(&ClientMessage::IceCandidate {
        target_user_id: UserId::from("a"),
        payload: candidate.clone(),
    })
    .await
    .expect("send candidate");
    assert_eq!(
        a.recv().await.expect("candidate"),
        ServerMessage::IceCandidate {
            user_id: UserId::from("b"),
            payload: candidate
        }
    );
}

#[tokio::test]
async fn test_signal_to_absent_peer_is_dropped() {
    init_tracing();

    let server = TestServer::start().await.expect("Failed to start server");
    let mut a = TestClient::connect(&server.ws_url()).await.expect("connect a");
    a.join("r1", server.token_for("a")).await.expect("join a");

    a.send(&ClientMessage::Offer {
        target_user_id: UserId::from("gone"),
        payload: json!({ "sdp": "v=0" }),
    })
    .await
    .expect("send offer");

    a.expect_silence().await.expect("no error reply");
}
