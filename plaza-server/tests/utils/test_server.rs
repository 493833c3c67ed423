use anyhow::{Context, Result};
use plaza_core::{RoomBounds, UserId};
use plaza_server::collaborators::{Identity, JwtVerifier, StaticRoomDirectory};
use plaza_server::{ConnectionGateway, ReclaimPolicy, RoomRegistry, router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

pub const TEST_SECRET: &str = "integration-secret-at-least-32-bytes";

/// A live server bound to an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub gateway: ConnectionGateway,
    verifier: JwtVerifier,
}

impl TestServer {
    /// Rooms: `r1` (20x15), `tiny` (1x1, every spawn lands on (0, 0)).
    pub async fn start() -> Result<Self> {
        let directory = StaticRoomDirectory::new()
            .with_room("r1", RoomBounds::new(20, 15))
            .with_room("tiny", RoomBounds::new(1, 1));

        let gateway = ConnectionGateway::new(
            Arc::new(RoomRegistry::new(ReclaimPolicy::ReapWhenEmpty)),
            Arc::new(JwtVerifier::new(TEST_SECRET)),
            Arc::new(directory),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("Failed to bind test listener")?;
        let addr = listener.local_addr()?;

        let app = router(gateway.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            gateway,
            verifier: JwtVerifier::new(TEST_SECRET),
        })
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn token_for(&self, user: &str) -> String {
        let identity = Identity {
            user_id: UserId::from(user),
            username: format!("{user} name"),
            avatar_url: Some(format!("/avatars/{user}.png")),
        };
        self.verifier
            .issue(&identity, Duration::from_secs(300))
            .expect("Failed to issue test token")
    }

    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// GETs a JSON document, failing on any non-success status.
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let response = reqwest::get(self.http_url(path))
            .await
            .with_context(|| format!("GET {path} failed"))?
            .error_for_status()?;
        Ok(response.json().await?)
    }
}
