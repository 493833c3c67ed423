use crate::error::MediaError;
use crate::media::{MediaInner, ProximityMediaController};
use async_trait::async_trait;
use plaza_core::UserId;
use serde_json::Value;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// A platform peer connection. Descriptions and candidates are opaque JSON.
#[async_trait(?Send)]
pub trait MediaPeer {
    /// Creates an offer and installs it as the local description.
    async fn create_offer(&self) -> Result<Value, MediaError>;

    /// Creates an answer and installs it as the local description.
    async fn create_answer(&self) -> Result<Value, MediaError>;

    async fn set_remote_description(&self, description: Value) -> Result<(), MediaError>;

    async fn add_ice_candidate(&self, candidate: Value) -> Result<(), MediaError>;

    fn set_audio_gain(&self, gain: f32);

    fn set_video_opacity(&self, opacity: f32);

    fn close(&self);
}

pub trait MediaPeerFactory {
    /// Builds a fresh connection. `handle` is how it reports back.
    fn create(&self, handle: PeerHandle) -> Result<Rc<dyn MediaPeer>, MediaError>;
}

/// Reports events of one negotiation back to the controller that started it.
///
/// Events from a connection that has since been replaced are ignored.
#[derive(Clone)]
pub struct PeerHandle {
    controller: Weak<RefCell<MediaInner>>,
    remote: UserId,
    generation: u64,
}

impl PeerHandle {
    pub(super) fn new(controller: Weak<RefCell<MediaInner>>, remote: UserId, generation: u64) -> Self {
        Self {
            controller,
            remote,
            generation,
        }
    }

    pub fn remote(&self) -> &UserId {
        &self.remote
    }

    fn controller(&self) -> Option<ProximityMediaController> {
        self.controller
            .upgrade()
            .map(|inner| ProximityMediaController { inner })
    }

    /// A local candidate was gathered and should go to the remote peer.
    pub fn local_candidate(&self, candidate: Value) {
        if let Some(controller) = self.controller() {
            controller.send_local_candidate(&self.remote, self.generation, candidate);
        }
    }

    pub async fn state_changed(&self, state: PeerConnectionState) {
        if let Some(controller) = self.controller() {
            controller
                .on_connection_state(&self.remote, self.generation, state)
                .await;
        }
    }
}
