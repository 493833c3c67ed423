//! Seams to the embedding platform: socket, render scene, asset loading and UI.

use crate::error::{AssetError, ClientError};
use crate::readiness::ReadinessGate;
use crate::state::{ConnectionState, NegotiationStatus};
use async_trait::async_trait;
use plaza_core::{ClientMessage, GridPosition, UserId};

/// Outbound half of the room connection.
pub trait SocketSink {
    fn send(&self, msg: &ClientMessage) -> Result<(), ClientError>;
    fn close(&self);
}

/// Handle to a loaded image, as understood by the scene.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssetId(pub String);

#[async_trait(?Send)]
pub trait AssetLoader {
    async fn load(&self, url: &str) -> Result<AssetId, AssetError>;
}

/// The render scene for one visit. Owned exclusively by the controller.
pub trait Scene {
    fn start_render_loop(&mut self);
    fn stop_render_loop(&mut self);

    fn place_local_avatar(&mut self, at: GridPosition);

    fn spawn_remote(&mut self, user_id: &UserId, at: GridPosition, avatar: Option<&AssetId>);
    fn move_remote(&mut self, user_id: &UserId, to: GridPosition);
    fn despawn_remote(&mut self, user_id: &UserId);

    /// Walls and terrain live here; the server never checks them.
    fn is_walkable(&self, at: GridPosition) -> bool;

    /// Releases every render resource, remote entities included.
    fn destroy(&mut self);
}

#[async_trait(?Send)]
pub trait SceneFactory {
    async fn build(&self) -> Result<Box<dyn Scene>, ClientError>;
}

/// UI notifications. Every method defaults to doing nothing.
pub trait ClientObserver {
    fn user_id_assigned(&self, _user_id: &UserId) {}
    fn state_changed(&self, _state: ConnectionState) {}
    fn readiness_changed(&self, _gate: &ReadinessGate) {}
    fn movement_corrected(&self, _at: GridPosition) {}
    fn chat_received(&self, _from: &UserId, _message: &str, _private: bool) {}
    fn remote_media_changed(&self, _user_id: &UserId, _audio_muted: bool, _video_off: bool) {}
    fn negotiation_status(&self, _user_id: &UserId, _status: NegotiationStatus) {}
}

pub struct NoopObserver;

impl ClientObserver for NoopObserver {}
