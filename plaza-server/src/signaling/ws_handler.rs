use crate::signaling::ConnectionGateway;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(gateway): State<ConnectionGateway>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, gateway))
}

async fn handle_socket(socket: WebSocket, gateway: ConnectionGateway) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut connection = gateway.open(tx);
    let session_id = connection.session().id();
    info!("New WebSocket connection: {}", session_id);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match serde_json::to_string(&msg) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize server message: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    let Err(e) = connection.handle_text(text.as_str()).await else {
                        continue;
                    };
                    if e.closes_connection() {
                        warn!("Closing session {}: {}", session_id, e);
                        break;
                    }
                    warn!("Ignoring message from session {}: {}", session_id, e);
                }
                Message::Binary(_) => {
                    warn!("Ignoring binary frame from session {}", session_id);
                }
                Message::Close(_) => break,
                _ => {}
            }
        }

        // Leave the room before the outbound queue is released.
        connection.disconnect();
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => {
            if let Err(e) = send_task.await {
                if !e.is_cancelled() {
                    error!("Writer task for session {} failed: {}", session_id, e);
                }
            }
        }
    };

    info!("WebSocket disconnected: {}", session_id);
}
