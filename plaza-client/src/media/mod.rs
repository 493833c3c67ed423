//! Per-peer media links and distance-driven audio/video weighting.

mod negotiation_impl;
mod peer;
mod weighting_impl;

pub use peer::{MediaPeer, MediaPeerFactory, PeerConnectionState, PeerHandle};
pub use weighting_impl::PeerWeight;

use crate::host::{ClientObserver, SocketSink};
use crate::state::NegotiationStatus;
use plaza_core::{GridPosition, ProximityThresholds, UserId};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

/// Progress of the remote description for one negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RemoteDescription {
    /// We sent an offer and wait for the answer.
    Awaiting,
    /// Being applied, or buffered candidates are being flushed.
    Applying,
    Applied,
}

/// One negotiation attempt with a remote peer.
struct PeerLink {
    peer: Rc<dyn MediaPeer>,
    generation: u64,
    remote: RemoteDescription,
    /// Candidates that arrived before the remote description, in arrival order.
    pending_candidates: VecDeque<Value>,
    /// Serialized form of every candidate received on this link.
    seen_candidates: HashSet<String>,
}

impl PeerLink {
    fn new(peer: Rc<dyn MediaPeer>, generation: u64, remote: RemoteDescription) -> Self {
        Self {
            peer,
            generation,
            remote,
            pending_candidates: VecDeque::new(),
            seen_candidates: HashSet::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RemoteMedia {
    audio_muted: bool,
    video_off: bool,
}

/// Everything known about one remote participant, across renegotiations.
struct PeerEntry {
    position: GridPosition,
    media: RemoteMedia,
    status: Option<NegotiationStatus>,
    link: Option<PeerLink>,
}

impl PeerEntry {
    fn new(position: GridPosition) -> Self {
        Self {
            position,
            media: RemoteMedia::default(),
            status: None,
            link: None,
        }
    }
}

struct MediaInner {
    local_user: Option<UserId>,
    local_position: GridPosition,
    peers: HashMap<UserId, PeerEntry>,
    next_generation: u64,
    thresholds: ProximityThresholds,
    factory: Rc<dyn MediaPeerFactory>,
    signaling: Rc<dyn SocketSink>,
    observer: Rc<dyn ClientObserver>,
}

impl MediaInner {
    fn link_mut(&mut self, user_id: &UserId, generation: u64) -> Option<&mut PeerLink> {
        self.peers
            .get_mut(user_id)
            .and_then(|entry| entry.link.as_mut())
            .filter(|link| link.generation == generation)
    }
}

/// Keeps one media link per known remote participant.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ProximityMediaController {
    inner: Rc<RefCell<MediaInner>>,
}
