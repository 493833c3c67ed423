use crate::media::{PeerEntry, ProximityMediaController};
use plaza_core::{GridPosition, ProximityThresholds, UserId, proximity_weight};

/// Presentation of one remote peer for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeerWeight {
    /// Distance band weight: 1.0, 0.5 or 0.0.
    pub proximity: f32,
    pub gain: f32,
    pub opacity: f32,
}

impl ProximityMediaController {
    /// Recomputes every peer's weight from the latest positions and pushes
    /// gain and opacity to peers that have a live link.
    ///
    /// Called once per frame. Results are sorted by user id.
    pub fn apply_weights(&self) -> Vec<(UserId, PeerWeight)> {
        let inner = self.inner.borrow();
        let local = inner.local_position;

        let mut weights: Vec<(UserId, PeerWeight)> = inner
            .peers
            .iter()
            .map(|(user_id, entry)| {
                let weight = weigh(local, entry, inner.thresholds);
                if let Some(link) = &entry.link {
                    link.peer.set_audio_gain(weight.gain);
                    link.peer.set_video_opacity(weight.opacity);
                }
                (user_id.clone(), weight)
            })
            .collect();

        weights.sort_by(|a, b| a.0.cmp(&b.0));
        weights
    }

    pub fn weight_of(&self, user_id: &UserId) -> Option<PeerWeight> {
        let inner = self.inner.borrow();
        let entry = inner.peers.get(user_id)?;
        Some(weigh(inner.local_position, entry, inner.thresholds))
    }
}

/// Muted audio and disabled video zero their channel regardless of distance.
fn weigh(local: GridPosition, entry: &PeerEntry, thresholds: ProximityThresholds) -> PeerWeight {
    let proximity = proximity_weight(local, entry.position, thresholds);
    PeerWeight {
        proximity,
        gain: if entry.media.audio_muted { 0.0 } else { proximity },
        opacity: if entry.media.video_off { 0.0 } else { proximity },
    }
}

#[cfg(test)]
mod tests {
    use crate::media::ProximityMediaController;
    use crate::testing::{FakePeerFactory, FakeSocket, RecordingObserver};
    use plaza_core::{GridPosition, ProximityThresholds, UserId};
    use std::rc::Rc;

    fn media() -> (ProximityMediaController, Rc<FakePeerFactory>) {
        let factory = Rc::new(FakePeerFactory::default());
        let media = ProximityMediaController::new(
            factory.clone(),
            Rc::new(FakeSocket::default()),
            Rc::new(RecordingObserver::default()),
            ProximityThresholds::default(),
        );
        (media, factory)
    }

    #[tokio::test]
    async fn weight_scales_gain_and_opacity_by_distance() {
        let (media, factory) = media();
        media.set_local_position(GridPosition::new(10, 10));

        let near = UserId::from("near");
        media
            .peer_arrived(near.clone(), GridPosition::new(11, 9))
            .await
            .unwrap();
        media.track(UserId::from("mid"), GridPosition::new(13, 13));
        media.track(UserId::from("far"), GridPosition::new(20, 10));

        let weights = media.apply_weights();
        let bands: Vec<(&str, f32)> = weights
            .iter()
            .map(|(id, w)| (id.as_str(), w.proximity))
            .collect();
        assert_eq!(bands, vec![("far", 0.0), ("mid", 0.5), ("near", 1.0)]);

        let peer = factory.peer(0);
        assert_eq!(peer.gain(), Some(1.0));
        assert_eq!(peer.opacity(), Some(1.0));

        media.peer_moved(&near, GridPosition::new(14, 10));
        media.apply_weights();
        assert_eq!(peer.gain(), Some(0.5));
    }

    #[test]
    fn remote_mute_and_video_off_override_proximity() {
        let (media, _) = media();
        let peer = UserId::from("peer");
        media.track(peer.clone(), GridPosition::default());

        media.remote_media_changed(&peer, true, false);
        let weight = media.weight_of(&peer).unwrap();
        assert_eq!((weight.proximity, weight.gain, weight.opacity), (1.0, 0.0, 1.0));

        media.remote_media_changed(&peer, false, true);
        let weight = media.weight_of(&peer).unwrap();
        assert_eq!((weight.gain, weight.opacity), (1.0, 0.0));
    }
}
