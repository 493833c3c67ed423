use crate::error::MediaError;
use crate::host::{ClientObserver, SocketSink};
use crate::media::{
    MediaInner, MediaPeer, MediaPeerFactory, PeerConnectionState, PeerEntry, PeerHandle,
    PeerLink, ProximityMediaController, RemoteDescription,
};
use crate::state::NegotiationStatus;
use plaza_core::{GridPosition, ProximityThresholds, SignalKind, UserId};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, info, warn};

impl ProximityMediaController {
    pub fn new(
        factory: Rc<dyn MediaPeerFactory>,
        signaling: Rc<dyn SocketSink>,
        observer: Rc<dyn ClientObserver>,
        thresholds: ProximityThresholds,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(MediaInner {
                local_user: None,
                local_position: GridPosition::default(),
                peers: HashMap::new(),
                next_generation: 0,
                thresholds,
                factory,
                signaling,
                observer,
            })),
        }
    }

    pub fn set_local_user(&self, user_id: UserId) {
        self.inner.borrow_mut().local_user = Some(user_id);
    }

    pub fn set_local_position(&self, at: GridPosition) {
        self.inner.borrow_mut().local_position = at;
    }

    /// Registers a participant that was already in the room. It will offer to us.
    pub fn track(&self, user_id: UserId, at: GridPosition) {
        let mut inner = self.inner.borrow_mut();
        inner
            .peers
            .entry(user_id)
            .and_modify(|entry| entry.position = at)
            .or_insert_with(|| PeerEntry::new(at));
    }

    /// A participant arrived after us: we start the negotiation.
    ///
    /// A repeated arrival for a peer that already has a link is a no-op.
    pub async fn peer_arrived(&self, user_id: UserId, at: GridPosition) -> Result<(), MediaError> {
        self.track(user_id.clone(), at);
        let linked = self
            .inner
            .borrow()
            .peers
            .get(&user_id)
            .is_some_and(|entry| entry.link.is_some());
        if linked {
            debug!("Media link with {} already exists", user_id);
            return Ok(());
        }
        self.negotiate(&user_id).await
    }

    pub fn peer_moved(&self, user_id: &UserId, at: GridPosition) {
        if let Some(entry) = self.inner.borrow_mut().peers.get_mut(user_id) {
            entry.position = at;
        }
    }

    pub fn peer_left(&self, user_id: &UserId) {
        let removed = self.inner.borrow_mut().peers.remove(user_id);
        if let Some(link) = removed.and_then(|entry| entry.link) {
            debug!("Closing media link with {}", user_id);
            link.peer.close();
        }
    }

    pub fn remote_media_changed(&self, user_id: &UserId, audio_muted: bool, video_off: bool) {
        if let Some(entry) = self.inner.borrow_mut().peers.get_mut(user_id) {
            entry.media.audio_muted = audio_muted;
            entry.media.video_off = video_off;
        }
    }

    pub fn status(&self, user_id: &UserId) -> Option<NegotiationStatus> {
        self.inner
            .borrow()
            .peers
            .get(user_id)
            .and_then(|entry| entry.status)
    }

    pub fn peer_count(&self) -> usize {
        self.inner.borrow().peers.len()
    }

    /// Closes every link and forgets every peer.
    pub fn close_all(&self) {
        let peers = {
            let mut inner = self.inner.borrow_mut();
            inner.local_user = None;
            inner.local_position = GridPosition::default();
            std::mem::take(&mut inner.peers)
        };
        for (user_id, entry) in peers {
            if let Some(link) = entry.link {
                debug!("Closing media link with {}", user_id);
                link.peer.close();
            }
        }
    }

    /// Answers an offer, replacing any link with `from`.
    ///
    /// When both sides offer at once the side with the smaller user id keeps
    /// its own offer and drops the incoming one; the other side yields.
    pub async fn handle_offer(&self, from: &UserId, offer: Value) -> Result<(), MediaError> {
        if self.keeps_own_offer(from) {
            debug!("Ignoring colliding offer from {}", from);
            return Ok(());
        }
        let (peer, generation) = self.open_link(from, RemoteDescription::Applying)?;

        peer.set_remote_description(offer).await?;
        if !self.flush_candidates(from, generation).await {
            return Ok(());
        }

        let answer = peer.create_answer().await?;
        if !self.is_current(from, generation) {
            debug!("Dropping stale answer for {}", from);
            return Ok(());
        }
        self.signal(SignalKind::Answer, from, answer)
    }

    pub async fn handle_answer(&self, from: &UserId, answer: Value) -> Result<(), MediaError> {
        let claimed = {
            let mut inner = self.inner.borrow_mut();
            let link = inner
                .peers
                .get_mut(from)
                .and_then(|entry| entry.link.as_mut())
                .filter(|link| link.remote == RemoteDescription::Awaiting);
            link.map(|link| {
                link.remote = RemoteDescription::Applying;
                (Rc::clone(&link.peer), link.generation)
            })
        };
        let Some((peer, generation)) = claimed else {
            debug!("Ignoring unexpected answer from {}", from);
            return Ok(());
        };

        peer.set_remote_description(answer).await?;
        self.flush_candidates(from, generation).await;
        Ok(())
    }

    pub async fn handle_candidate(&self, from: &UserId, candidate: Value) -> Result<(), MediaError> {
        let peer = {
            let mut inner = self.inner.borrow_mut();
            let Some(link) = inner.peers.get_mut(from).and_then(|e| e.link.as_mut()) else {
                debug!("Dropping candidate from {} without a media link", from);
                return Ok(());
            };
            if !link.seen_candidates.insert(candidate.to_string()) {
                debug!("Dropping duplicate candidate from {}", from);
                return Ok(());
            }
            if link.remote != RemoteDescription::Applied {
                link.pending_candidates.push_back(candidate);
                return Ok(());
            }
            Rc::clone(&link.peer)
        };
        peer.add_ice_candidate(candidate).await
    }

    pub(crate) fn send_local_candidate(&self, to: &UserId, generation: u64, candidate: Value) {
        if !self.is_current(to, generation) {
            return;
        }
        if let Err(e) = self.signal(SignalKind::IceCandidate, to, candidate) {
            warn!("Failed to send candidate to {}: {}", to, e);
        }
    }

    pub(crate) async fn on_connection_state(
        &self,
        user_id: &UserId,
        generation: u64,
        state: PeerConnectionState,
    ) {
        match state {
            PeerConnectionState::Connected => {
                if self.is_current(user_id, generation) {
                    info!("Media link with {} connected", user_id);
                    self.set_status(user_id, NegotiationStatus::Connected);
                }
            }
            PeerConnectionState::Failed => {
                if !self.tear_down_failed(user_id, generation) {
                    return;
                }
                warn!("Media link with {} failed, renegotiating", user_id);
                self.set_status(user_id, NegotiationStatus::Reconnecting);
                if let Err(e) = self.negotiate(user_id).await {
                    warn!("Renegotiation with {} failed: {}", user_id, e);
                }
            }
            other => debug!("Media link with {} is {:?}", user_id, other),
        }
    }

    /// Drops a failed link. False when the link was already replaced.
    fn tear_down_failed(&self, user_id: &UserId, generation: u64) -> bool {
        let link = {
            let mut inner = self.inner.borrow_mut();
            let Some(entry) = inner.peers.get_mut(user_id) else {
                return false;
            };
            if entry.link.as_ref().map(|link| link.generation) != Some(generation) {
                return false;
            }
            entry.link.take()
        };
        if let Some(link) = link {
            link.peer.close();
        }
        true
    }

    /// Whether an offer from `from` collides with one we are still waiting on
    /// and we are the side that keeps it.
    fn keeps_own_offer(&self, from: &UserId) -> bool {
        let inner = self.inner.borrow();
        let awaiting = inner
            .peers
            .get(from)
            .and_then(|entry| entry.link.as_ref())
            .is_some_and(|link| link.remote == RemoteDescription::Awaiting);
        awaiting && inner.local_user.as_ref().is_some_and(|me| me < from)
    }

    async fn negotiate(&self, user_id: &UserId) -> Result<(), MediaError> {
        let (peer, generation) = self.open_link(user_id, RemoteDescription::Awaiting)?;

        let offer = peer.create_offer().await?;
        if !self.is_current(user_id, generation) {
            debug!("Dropping stale offer for {}", user_id);
            return Ok(());
        }
        self.signal(SignalKind::Offer, user_id, offer)
    }

    /// Replaces whatever link exists with a fresh connection.
    fn open_link(
        &self,
        user_id: &UserId,
        remote: RemoteDescription,
    ) -> Result<(Rc<dyn MediaPeer>, u64), MediaError> {
        let (factory, generation) = {
            let mut inner = self.inner.borrow_mut();
            let generation = inner.next_generation;
            inner.next_generation += 1;
            (Rc::clone(&inner.factory), generation)
        };

        let handle = PeerHandle::new(Rc::downgrade(&self.inner), user_id.clone(), generation);
        let peer = factory.create(handle)?;

        let replaced = {
            let mut inner = self.inner.borrow_mut();
            let entry = inner
                .peers
                .entry(user_id.clone())
                .or_insert_with(|| PeerEntry::new(GridPosition::default()));
            entry
                .link
                .replace(PeerLink::new(Rc::clone(&peer), generation, remote))
        };
        if let Some(old) = replaced {
            old.peer.close();
        }

        if self.status(user_id) != Some(NegotiationStatus::Reconnecting) {
            self.set_status(user_id, NegotiationStatus::Negotiating);
        }
        Ok((peer, generation))
    }

    /// Applies buffered candidates in arrival order, then marks the link ready.
    ///
    /// Candidates arriving mid-flush join the back of the queue. Returns
    /// false when the link was replaced in the meantime.
    async fn flush_candidates(&self, user_id: &UserId, generation: u64) -> bool {
        loop {
            let (peer, candidate) = {
                let mut inner = self.inner.borrow_mut();
                let Some(link) = inner.link_mut(user_id, generation) else {
                    return false;
                };
                match link.pending_candidates.pop_front() {
                    Some(candidate) => (Rc::clone(&link.peer), candidate),
                    None => {
                        link.remote = RemoteDescription::Applied;
                        return true;
                    }
                }
            };
            if let Err(e) = peer.add_ice_candidate(candidate).await {
                warn!("Failed to apply buffered candidate from {}: {}", user_id, e);
            }
        }
    }

    fn is_current(&self, user_id: &UserId, generation: u64) -> bool {
        self.inner.borrow_mut().link_mut(user_id, generation).is_some()
    }

    fn set_status(&self, user_id: &UserId, status: NegotiationStatus) {
        let observer = {
            let mut inner = self.inner.borrow_mut();
            let Some(entry) = inner.peers.get_mut(user_id) else {
                return;
            };
            if entry.status == Some(status) {
                return;
            }
            entry.status = Some(status);
            Rc::clone(&inner.observer)
        };
        observer.negotiation_status(user_id, status);
    }

    fn signal(&self, kind: SignalKind, to: &UserId, payload: Value) -> Result<(), MediaError> {
        let signaling = Rc::clone(&self.inner.borrow().signaling);
        signaling
            .send(&kind.into_client_message(to.clone(), payload))
            .map_err(MediaError::from)
    }
}
