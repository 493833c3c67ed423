use crate::collaborators::Identity;
use plaza_core::{GridPosition, RoomId, ServerMessage, SessionId, UserId};
use tokio::sync::mpsc;
use tracing::debug;

/// Outbound queue of one connection. Sends never suspend.
pub type SessionSender = mpsc::UnboundedSender<ServerMessage>;

/// Per-connection server state.
///
/// Identity, position and room are all absent until the join handshake
/// succeeds; a session belongs to at most one room.
pub struct ParticipantSession {
    id: SessionId,
    identity: Option<Identity>,
    position: GridPosition,
    room_id: Option<RoomId>,
    sender: SessionSender,
}

impl ParticipantSession {
    pub fn new(sender: SessionSender) -> Self {
        Self {
            id: SessionId::new(),
            identity: None,
            position: GridPosition::default(),
            room_id: None,
            sender,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.identity.as_ref().map(|i| &i.user_id)
    }

    pub fn room_id(&self) -> Option<&RoomId> {
        self.room_id.as_ref()
    }

    pub fn is_joined(&self) -> bool {
        self.room_id.is_some()
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    pub fn sender(&self) -> &SessionSender {
        &self.sender
    }

    pub fn attach(&mut self, identity: Identity, room_id: RoomId, spawn: GridPosition) {
        self.identity = Some(identity);
        self.room_id = Some(room_id);
        self.position = spawn;
    }

    pub fn set_position(&mut self, position: GridPosition) {
        self.position = position;
    }

    /// Leaves the current room, returning it if there was one.
    pub fn detach(&mut self) -> Option<RoomId> {
        self.room_id.take()
    }

    pub fn send(&self, msg: ServerMessage) {
        if self.sender.send(msg).is_err() {
            debug!("Outbound queue closed for session {}", self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_is_anonymous_until_attached() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = ParticipantSession::new(tx);

        assert!(!session.is_joined());
        assert!(session.user_id().is_none());

        session.attach(
            Identity::new("alice"),
            RoomId::from("r1"),
            GridPosition::new(2, 3),
        );

        assert!(session.is_joined());
        assert_eq!(session.user_id(), Some(&UserId::from("alice")));
        assert_eq!(session.position(), GridPosition::new(2, 3));
        assert_eq!(session.detach(), Some(RoomId::from("r1")));
        assert_eq!(session.detach(), None);
    }

    #[test]
    fn send_after_receiver_dropped_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ParticipantSession::new(tx);
        drop(rx);

        session.send(ServerMessage::MovementRejected { x: 0, y: 0 });
    }
}
