use crate::collaborators::{IdentityVerifier, RoomDirectory};
use crate::error::GatewayError;
use crate::room::{RoomMember, RoomRegistry};
use crate::session::{ParticipantSession, SessionSender};
use crate::signaling::SignalRelay;
use plaza_core::{
    ClientMessage, GridPosition, MovementValidator, RoomBounds, RoomId, ServerMessage, SignalKind,
    UserId,
};
use rand::Rng;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

struct GatewayInner {
    registry: Arc<RoomRegistry>,
    identity: Arc<dyn IdentityVerifier>,
    directory: Arc<dyn RoomDirectory>,
    relay: SignalRelay,
}

/// Entry point for raw connections: runs the join handshake and dispatches
/// every later message of a connection to the registry or the relay.
#[derive(Clone)]
pub struct ConnectionGateway {
    inner: Arc<GatewayInner>,
}

impl ConnectionGateway {
    pub fn new(
        registry: Arc<RoomRegistry>,
        identity: Arc<dyn IdentityVerifier>,
        directory: Arc<dyn RoomDirectory>,
    ) -> Self {
        let relay = SignalRelay::new(Arc::clone(&registry));
        Self {
            inner: Arc::new(GatewayInner {
                registry,
                identity,
                directory,
                relay,
            }),
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.inner.registry
    }

    /// Starts tracking a freshly accepted connection.
    pub fn open(&self, sender: SessionSender) -> Connection {
        let session = ParticipantSession::new(sender);
        debug!("Session {} opened", session.id());
        Connection {
            gateway: self.clone(),
            session,
        }
    }
}

/// One connection's view of the gateway. Messages must be fed in arrival order.
///
/// Dropping a `Connection` removes its session from its room, so the
/// remaining members always hear `ParticipantLeft` before the
/// connection's resources go away.
pub struct Connection {
    gateway: ConnectionGateway,
    session: ParticipantSession,
}

impl Connection {
    pub fn session(&self) -> &ParticipantSession {
        &self.session
    }

    /// Decodes one text frame and handles it.
    pub async fn handle_text(&mut self, text: &str) -> Result<(), GatewayError> {
        let msg = serde_json::from_str::<ClientMessage>(text)
            .map_err(|e| GatewayError::ProtocolViolation(format!("malformed message: {e}")))?;
        self.handle(msg).await
    }

    pub async fn handle(&mut self, msg: ClientMessage) -> Result<(), GatewayError> {
        let Some(room_id) = self.session.room_id().cloned() else {
            return match msg {
                ClientMessage::Join {
                    room_id,
                    auth_token,
                } => self.join(room_id, &auth_token).await,
                other => Err(GatewayError::ProtocolViolation(format!(
                    "{} before join",
                    other.kind()
                ))),
            };
        };
        let Some(user_id) = self.session.user_id().cloned() else {
            return Err(GatewayError::ProtocolViolation(
                "joined session without identity".to_string(),
            ));
        };
        if !self
            .gateway
            .inner
            .registry
            .is_member(&room_id, self.session.id())
        {
            self.session.detach();
            return Err(GatewayError::Superseded);
        }

        match msg {
            ClientMessage::Join { .. } => Err(GatewayError::ProtocolViolation(
                "session already joined".to_string(),
            )),

            ClientMessage::Move { x, y } => {
                self.apply_move(&room_id, GridPosition::new(x, y));
                Ok(())
            }

            ClientMessage::Chat {
                message,
                target_user_ids,
            } => {
                self.relay_chat(&room_id, user_id, message, target_user_ids);
                Ok(())
            }

            ClientMessage::MediaStateUpdate {
                is_audio_muted,
                is_video_off,
                ..
            } => {
                let update = ServerMessage::MediaStateUpdate {
                    user_id,
                    is_audio_muted,
                    is_video_off,
                };
                self.gateway
                    .inner
                    .registry
                    .broadcast(&room_id, self.session.id(), &update);
                Ok(())
            }

            ClientMessage::Offer {
                target_user_id,
                payload,
            } => {
                self.relay_signal(&room_id, &user_id, &target_user_id, SignalKind::Offer, payload);
                Ok(())
            }

            ClientMessage::Answer {
                target_user_id,
                payload,
            } => {
                self.relay_signal(&room_id, &user_id, &target_user_id, SignalKind::Answer, payload);
                Ok(())
            }

            ClientMessage::IceCandidate {
                target_user_id,
                payload,
            } => {
                self.relay_signal(
                    &room_id,
                    &user_id,
                    &target_user_id,
                    SignalKind::IceCandidate,
                    payload,
                );
                Ok(())
            }
        }
    }

    async fn join(&mut self, room_id: RoomId, auth_token: &str) -> Result<(), GatewayError> {
        let inner = Arc::clone(&self.gateway.inner);

        let identity = inner.identity.verify(auth_token).await?;
        let bounds = inner.directory.lookup(&room_id).await?;

        let spawn = spawn_point(bounds);
        info!(
            "User {} joining room {} at ({}, {})",
            identity.user_id, room_id, spawn.x, spawn.y
        );

        self.session
            .attach(identity.clone(), room_id.clone(), spawn);

        let member = RoomMember {
            session_id: self.session.id(),
            identity,
            position: spawn,
            sender: self.session.sender().clone(),
        };
        let snapshot = inner.registry.add_to_room(&room_id, bounds, member);
        debug!("Join snapshot for {} has {} members", room_id, snapshot.len());

        Ok(())
    }

    fn apply_move(&mut self, room_id: &RoomId, proposed: GridPosition) {
        let last = self.session.position();

        if !MovementValidator::accepts(last, proposed) {
            debug!(
                "Rejecting move of session {} from ({}, {}) to ({}, {})",
                self.session.id(),
                last.x,
                last.y,
                proposed.x,
                proposed.y
            );
            self.session.send(ServerMessage::MovementRejected {
                x: last.x,
                y: last.y,
            });
            return;
        }

        self.session.set_position(proposed);
        self.gateway
            .inner
            .registry
            .move_member(room_id, self.session.id(), proposed);
    }

    fn relay_chat(
        &self,
        room_id: &RoomId,
        from: UserId,
        message: String,
        targets: Option<Vec<UserId>>,
    ) {
        let registry = &self.gateway.inner.registry;
        let chat = ServerMessage::Chat {
            user_id: from.clone(),
            message,
            target_user_ids: targets.clone(),
        };

        match targets {
            None => {
                registry.broadcast(room_id, self.session.id(), &chat);
            }
            Some(targets) => {
                let mut seen = HashSet::new();
                for target in targets {
                    if target == from || !seen.insert(target.clone()) {
                        continue;
                    }
                    registry.send_to_user(room_id, &target, &chat);
                }
            }
        }
    }

    fn relay_signal(
        &self,
        room_id: &RoomId,
        from: &UserId,
        target: &UserId,
        kind: SignalKind,
        payload: serde_json::Value,
    ) {
        self.gateway
            .inner
            .relay
            .relay(room_id, from, target, kind, payload);
    }

    /// Removes the session from its room. Safe to call more than once.
    pub fn disconnect(&mut self) {
        let Some(room_id) = self.session.detach() else {
            return;
        };
        self.gateway
            .inner
            .registry
            .remove_from_room(&room_id, self.session.id());
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Uniform over the room grid. Walls and occupants are not considered.
fn spawn_point(bounds: RoomBounds) -> GridPosition {
    let mut rng = rand::thread_rng();
    let x = rng.gen_range(0..grid_extent(bounds.width));
    let y = rng.gen_range(0..grid_extent(bounds.height));
    GridPosition::new(x, y)
}

/// Grid coordinates are `i32`; cells past `i32::MAX` are unreachable.
fn grid_extent(cells: u32) -> i32 {
    i32::try_from(cells).unwrap_or(i32::MAX).max(1)
}
