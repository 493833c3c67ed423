//! Client side of a plaza room visit.
//!
//! Everything here runs on one cooperative thread. Shared state lives in
//! `Rc<RefCell<_>>` and no borrow is ever held across an `.await`.

pub mod controller;
pub mod error;
pub mod host;
pub mod media;
pub mod readiness;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::{ClientConfig, ClientHost, ClientSessionController};
pub use error::{AssetError, ClientError, MediaError};
pub use host::{AssetId, AssetLoader, ClientObserver, NoopObserver, Scene, SceneFactory, SocketSink};
pub use media::{
    MediaPeer, MediaPeerFactory, PeerConnectionState, PeerHandle, PeerWeight,
    ProximityMediaController,
};
pub use readiness::{ReadinessGate, ReadinessStep, StepStatus};
pub use state::{ConnectionState, NegotiationStatus};
