use crate::model::position::GridPosition;
use crate::model::room::RoomId;
use crate::model::user::UserId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Room member as seen in a join snapshot.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct MemberSnapshot {
    pub user_id: UserId,
    pub x: i32,
    pub y: i32,
}

impl MemberSnapshot {
    pub fn new(user_id: UserId, position: GridPosition) -> Self {
        Self {
            user_id,
            x: position.x,
            y: position.y,
        }
    }

    pub fn position(&self) -> GridPosition {
        GridPosition::new(self.x, self.y)
    }
}

/// Messages sent by a client over its persistent connection.
///
/// On the wire every message is `{ "type": <variant>, "payload": {...} }`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        room_id: RoomId,
        auth_token: String,
    },
    Move {
        x: i32,
        y: i32,
    },
    Chat {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_user_ids: Option<Vec<UserId>>,
    },
    /// `user_id` is informational only; the server stamps the sender.
    MediaStateUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
        is_audio_muted: bool,
        is_video_off: bool,
    },
    Offer {
        target_user_id: UserId,
        payload: Value,
    },
    Answer {
        target_user_id: UserId,
        payload: Value,
    },
    IceCandidate {
        target_user_id: UserId,
        payload: Value,
    },
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "Join",
            ClientMessage::Move { .. } => "Move",
            ClientMessage::Chat { .. } => "Chat",
            ClientMessage::MediaStateUpdate { .. } => "MediaStateUpdate",
            ClientMessage::Offer { .. } => "Offer",
            ClientMessage::Answer { .. } => "Answer",
            ClientMessage::IceCandidate { .. } => "IceCandidate",
        }
    }
}

/// Messages pushed by the server to a connected client.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Sent only to the joiner, right after it has been registered.
    SpaceJoined {
        spawn: GridPosition,
        user_id: UserId,
        users: Vec<MemberSnapshot>,
    },
    ParticipantJoined {
        user_id: UserId,
        x: i32,
        y: i32,
    },
    ParticipantLeft {
        user_id: UserId,
    },
    Movement {
        user_id: UserId,
        x: i32,
        y: i32,
    },
    /// Carries the sender's last accepted position.
    MovementRejected {
        x: i32,
        y: i32,
    },
    Chat {
        user_id: UserId,
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_user_ids: Option<Vec<UserId>>,
    },
    MediaStateUpdate {
        user_id: UserId,
        is_audio_muted: bool,
        is_video_off: bool,
    },
    /// `user_id` is the sender of the negotiation payload.
    Offer {
        user_id: UserId,
        payload: Value,
    },
    Answer {
        user_id: UserId,
        payload: Value,
    },
    IceCandidate {
        user_id: UserId,
        payload: Value,
    },
}

/// The three opaque negotiation payload kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    Offer,
    Answer,
    IceCandidate,
}

impl SignalKind {
    /// Wraps a payload into the server-side message tagged with its sender.
    pub fn into_server_message(self, from: UserId, payload: Value) -> ServerMessage {
        match self {
            SignalKind::Offer => ServerMessage::Offer {
                user_id: from,
                payload,
            },
            SignalKind::Answer => ServerMessage::Answer {
                user_id: from,
                payload,
            },
            SignalKind::IceCandidate => ServerMessage::IceCandidate {
                user_id: from,
                payload,
            },
        }
    }

    /// Wraps a payload into the client-side message addressed to `target`.
    pub fn into_client_message(self, target: UserId, payload: Value) -> ClientMessage {
        match self {
            SignalKind::Offer => ClientMessage::Offer {
                target_user_id: target,
                payload,
            },
            SignalKind::Answer => ClientMessage::Answer {
                target_user_id: target,
                payload,
            },
            SignalKind::IceCandidate => ClientMessage::IceCandidate {
                target_user_id: target,
                payload,
            },
        }
    }
}
