use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use plaza_core::{ClientMessage, GridPosition, RoomId, ServerMessage};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Timeout for a message that is expected to arrive (ms).
pub const RECV_TIMEOUT_MS: u64 = 3000;

/// How long to listen before concluding nothing was sent (ms).
pub const SILENCE_MS: u64 = 250;

pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(url: &str) -> Result<Self> {
        let (ws, _) = connect_async(url)
            .await
            .context("Failed to open WebSocket")?;
        Ok(Self { ws })
    }

    pub async fn send(&mut self, msg: &ClientMessage) -> Result<()> {
        let json = serde_json::to_string(msg)?;
        self.send_raw(json).await
    }

    pub async fn send_raw(&mut self, text: String) -> Result<()> {
        self.ws
            .send(Message::Text(text.into()))
            .await
            .context("Failed to send frame")
    }

    pub async fn join(&mut self, room: &str, token: String) -> Result<ServerMessage> {
        self.send(&ClientMessage::Join {
            room_id: RoomId::from(room),
            auth_token: token,
        })
        .await?;
        let reply = self.recv().await?;
        anyhow::ensure!(
            matches!(reply, ServerMessage::SpaceJoined { .. }),
            "Expected SpaceJoined, got {:?}",
            reply
        );
        Ok(reply)
    }

    /// Next server message, skipping control frames.
    pub async fn recv(&mut self) -> Result<ServerMessage> {
        let deadline = Duration::from_millis(RECV_TIMEOUT_MS);
        loop {
            let frame = tokio::time::timeout(deadline, self.ws.next())
                .await
                .context("Timeout waiting for server message")?;

            match frame {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(text.as_str())
                        .context("Server sent an undecodable message");
                }
                Some(Ok(Message::Close(_))) | None => anyhow::bail!("Connection closed"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e).context("WebSocket error"),
            }
        }
    }

    /// Asserts no protocol message shows up for a short while.
    pub async fn expect_silence(&mut self) -> Result<()> {
        match tokio::time::timeout(Duration::from_millis(SILENCE_MS), self.ws.next()).await {
            Err(_) => Ok(()),
            Ok(Some(Ok(Message::Text(text)))) => anyhow::bail!("Unexpected message: {}", text),
            Ok(_) => Ok(()),
        }
    }

    /// True when the server closed the connection without sending any protocol message.
    pub async fn closed_without_response(&mut self) -> bool {
        let deadline = Duration::from_millis(RECV_TIMEOUT_MS);
        loop {
            match tokio::time::timeout(deadline, self.ws.next()).await {
                Err(_) => return false,
                Ok(Some(Ok(Message::Text(_)))) => return false,
                Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    /// Steps one cell at a time from `from` to `to`, returning the final position.
    pub async fn walk(&mut self, from: GridPosition, to: GridPosition) -> Result<GridPosition> {
        let mut at = from;
        while at != to {
            at = GridPosition::new(
                at.x + (to.x - at.x).signum(),
                at.y + (to.y - at.y).signum(),
            );
            self.send(&ClientMessage::Move { x: at.x, y: at.y }).await?;
        }
        Ok(at)
    }

    pub async fn close(mut self) -> Result<()> {
        self.ws.close(None).await.context("Failed to close")?;
        Ok(())
    }
}

/// Reads messages until `n` have arrived.
pub async fn recv_n(client: &mut TestClient, n: usize) -> Result<Vec<ServerMessage>> {
    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        out.push(client.recv().await?);
    }
    Ok(out)
}
