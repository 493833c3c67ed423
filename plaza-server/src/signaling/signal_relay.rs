use crate::room::RoomRegistry;
use plaza_core::{RoomId, SignalKind, UserId};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Forwards opaque negotiation payloads between two members of one room.
///
/// The payload is never inspected; it is tagged with the sender and handed
/// on as-is. Targets that cannot be resolved are dropped silently.
#[derive(Clone)]
pub struct SignalRelay {
    registry: Arc<RoomRegistry>,
}

impl SignalRelay {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub fn relay(
        &self,
        room_id: &RoomId,
        from: &UserId,
        target: &UserId,
        kind: SignalKind,
        payload: Value,
    ) -> bool {
        if from == target {
            debug!("Dropping {:?} from {} addressed to itself", kind, from);
            return false;
        }

        let msg = kind.into_server_message(from.clone(), payload);
        let delivered = self.registry.send_to_user(room_id, target, &msg);
        if delivered == 0 {
            debug!(
                "Dropping {:?} from {}: target {} is not in room {}",
                kind, from, target, room_id
            );
        }
        delivered > 0
    }
}
