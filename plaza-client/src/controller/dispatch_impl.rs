use crate::controller::ClientSessionController;
use crate::error::ClientError;
use crate::media::PeerWeight;
use crate::state::ConnectionState;
use plaza_core::{ClientMessage, GridPosition, MovementValidator, ServerMessage, UserId};
use std::collections::HashSet;
use tracing::{debug, info, warn};

impl ClientSessionController {
    /// Feeds one decoded server message into the visit.
    ///
    /// Until the scene exists messages are queued and later replayed in
    /// arrival order. The user id from `SpaceJoined` is surfaced right away
    /// regardless.
    pub async fn handle_message(&self, msg: ServerMessage) {
        if let ServerMessage::SpaceJoined { user_id, .. } = &msg {
            self.assign_user_id(user_id);
        }

        let epoch = {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed || inner.state == ConnectionState::Disconnected {
                debug!("Dropping message received while disconnected");
                return;
            }
            if inner.scene.is_none() || inner.flushing {
                inner.pending.push_back(msg);
                return;
            }
            inner.epoch
        };

        self.apply(msg, epoch).await;
    }

    /// Decodes a raw text frame. Undecodable frames are logged and skipped.
    pub async fn handle_text(&self, text: &str) {
        match serde_json::from_str::<ServerMessage>(text) {
            Ok(msg) => self.handle_message(msg).await,
            Err(e) => warn!("Ignoring undecodable server message: {}", e),
        }
    }

    pub(super) async fn flush_pending(&self, epoch: u64) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.flushing {
                return;
            }
            inner.flushing = true;
        }

        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                if inner.epoch != epoch {
                    return;
                }
                match inner.pending.pop_front() {
                    Some(msg) => msg,
                    None => {
                        inner.flushing = false;
                        return;
                    }
                }
            };
            self.apply(next, epoch).await;
        }
    }

    async fn apply(&self, msg: ServerMessage, epoch: u64) {
        if !self.is_current(epoch) {
            return;
        }
        let media = self.media();

        match msg {
            ServerMessage::SpaceJoined {
                spawn,
                user_id,
                users,
            } => {
                info!("Joined at ({}, {}) with {} others", spawn.x, spawn.y, users.len());
                self.place_local(spawn);
                self.set_state(ConnectionState::Joined);
                media.set_local_user(user_id.clone());

                let others: Vec<(UserId, GridPosition)> = users
                    .into_iter()
                    .filter(|member| member.user_id != user_id)
                    .map(|member| {
                        let at = member.position();
                        (member.user_id, at)
                    })
                    .collect();
                let present: HashSet<UserId> = others.iter().map(|(id, _)| id.clone()).collect();
                self.retain_remotes(&present);
                for (id, at) in &others {
                    media.track(id.clone(), *at);
                }
                futures::future::join_all(
                    others
                        .into_iter()
                        .map(|(id, at)| self.ensure_remote(id, at, epoch)),
                )
                .await;
            }

            ServerMessage::ParticipantJoined { user_id, x, y } => {
                if self.is_local(&user_id) {
                    return;
                }
                let at = GridPosition::new(x, y);
                let (_, negotiated) = futures::join!(
                    self.ensure_remote(user_id.clone(), at, epoch),
                    media.peer_arrived(user_id.clone(), at),
                );
                if let Err(e) = negotiated {
                    warn!("Could not start media with {}: {}", user_id, e);
                }
            }

            ServerMessage::ParticipantLeft { user_id } => {
                self.remove_remote(&user_id);
                media.peer_left(&user_id);
            }

            ServerMessage::Movement { user_id, x, y } => {
                let at = GridPosition::new(x, y);
                self.move_remote(&user_id, at);
                media.peer_moved(&user_id, at);
            }

            ServerMessage::MovementRejected { x, y } => {
                let at = GridPosition::new(x, y);
                debug!("Server corrected our position to ({}, {})", x, y);
                self.place_local(at);
                self.services.observer.movement_corrected(at);
            }

            ServerMessage::Chat {
                user_id,
                message,
                target_user_ids,
            } => {
                self.services
                    .observer
                    .chat_received(&user_id, &message, target_user_ids.is_some());
            }

            ServerMessage::MediaStateUpdate {
                user_id,
                is_audio_muted,
                is_video_off,
            } => {
                media.remote_media_changed(&user_id, is_audio_muted, is_video_off);
                self.services
                    .observer
                    .remote_media_changed(&user_id, is_audio_muted, is_video_off);
            }

            ServerMessage::Offer { user_id, payload } => {
                if let Err(e) = media.handle_offer(&user_id, payload).await {
                    warn!("Failed to answer offer from {}: {}", user_id, e);
                }
            }

            ServerMessage::Answer { user_id, payload } => {
                if let Err(e) = media.handle_answer(&user_id, payload).await {
                    warn!("Failed to apply answer from {}: {}", user_id, e);
                }
            }

            ServerMessage::IceCandidate { user_id, payload } => {
                if let Err(e) = media.handle_candidate(&user_id, payload).await {
                    warn!("Failed to apply candidate from {}: {}", user_id, e);
                }
            }
        }
    }

    fn assign_user_id(&self, user_id: &UserId) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed
                || inner.state == ConnectionState::Disconnected
                || inner.local_user.as_ref() == Some(user_id)
            {
                return;
            }
            inner.local_user = Some(user_id.clone());
        }
        self.services.observer.user_id_assigned(user_id);
    }

    fn is_local(&self, user_id: &UserId) -> bool {
        self.inner.borrow().local_user.as_ref() == Some(user_id)
    }

    fn place_local(&self, at: GridPosition) {
        {
            let mut inner = self.inner.borrow_mut();
            inner.local_position = at;
            if let Some(scene) = inner.scene.as_mut() {
                scene.place_local_avatar(at);
            }
        }
        self.media().set_local_position(at);
    }

    /// Moves the local avatar one step. Checked locally against the step
    /// rule and the scene's walls before anything is sent.
    pub fn move_to(&self, x: i32, y: i32) -> Result<(), ClientError> {
        let to = GridPosition::new(x, y);
        {
            let inner = self.inner.borrow();
            ensure_joined(inner.state)?;
            let from = inner.local_position;
            let walkable = inner.scene.as_ref().is_some_and(|s| s.is_walkable(to));
            if !walkable || !MovementValidator::accepts(from, to) {
                return Err(ClientError::IllegalMove { from, to });
            }
        }

        self.services.socket.send(&ClientMessage::Move { x, y })?;
        self.place_local(to);
        Ok(())
    }

    /// Without targets the message goes to the whole room.
    pub fn send_chat(
        &self,
        message: String,
        target_user_ids: Option<Vec<UserId>>,
    ) -> Result<(), ClientError> {
        ensure_joined(self.state())?;
        self.services.socket.send(&ClientMessage::Chat {
            message,
            target_user_ids,
        })
    }

    pub fn set_local_media(&self, is_audio_muted: bool, is_video_off: bool) -> Result<(), ClientError> {
        ensure_joined(self.state())?;
        self.services.socket.send(&ClientMessage::MediaStateUpdate {
            user_id: self.local_user(),
            is_audio_muted,
            is_video_off,
        })
    }

    /// Per-frame tick: reweights every remote peer by distance.
    pub fn frame(&self) -> Vec<(UserId, PeerWeight)> {
        if !self.state().is_joined() {
            return Vec::new();
        }
        self.media().apply_weights()
    }

}

/// A destroyed controller is always `Disconnected`, so this covers it too.
fn ensure_joined(state: ConnectionState) -> Result<(), ClientError> {
    if !state.is_joined() {
        return Err(ClientError::InvalidState {
            expected: ConnectionState::Joined,
            actual: state,
        });
    }
    Ok(())
}
