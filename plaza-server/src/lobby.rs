use crate::collaborators::Identity;
use crate::signaling::ConnectionGateway;
use axum::Json;
use axum::extract::{Path, State};
use plaza_core::RoomId;
use serde::Serialize;

/// Read-only occupancy view polled by the lobby.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomOccupancy {
    pub room_id: RoomId,
    pub count: usize,
    pub participants: Vec<Identity>,
}

impl RoomOccupancy {
    pub fn of(gateway: &ConnectionGateway, room_id: RoomId) -> Self {
        let participants = gateway.registry().participants(&room_id);
        Self {
            room_id,
            count: participants.len(),
            participants,
        }
    }
}

pub async fn room_participants(
    Path(room_id): Path<String>,
    State(gateway): State<ConnectionGateway>,
) -> Json<RoomOccupancy> {
    Json(RoomOccupancy::of(&gateway, RoomId::from(room_id)))
}
