use crate::collaborators::Identity;
use crate::room::{Room, RoomMember};
use dashmap::DashMap;
use plaza_core::{GridPosition, MemberSnapshot, RoomBounds, RoomId, ServerMessage, SessionId, UserId};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// What happens to a room entry once its last member leaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReclaimPolicy {
    /// Drop the entry; the next join recreates it.
    #[default]
    ReapWhenEmpty,
    /// Keep every room ever joined for the life of the process.
    Retain,
}

/// Authoritative room id -> members mapping.
///
/// Safe to share between connection tasks; all per-room work is serialized
/// by that room's member lock.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Arc<Room>>,
    policy: ReclaimPolicy,
}

impl RoomRegistry {
    pub fn new(policy: ReclaimPolicy) -> Self {
        Self {
            rooms: DashMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> ReclaimPolicy {
        self.policy
    }

    /// Adds a member, creating the room on first use.
    ///
    /// The joiner receives `SpaceJoined` with the returned snapshot and the
    /// rest of the room receives `ParticipantJoined`, atomically with the
    /// insertion.
    pub fn add_to_room(
        &self,
        room_id: &RoomId,
        bounds: RoomBounds,
        mut member: RoomMember,
    ) -> Vec<MemberSnapshot> {
        loop {
            let room = Arc::clone(
                self.rooms
                    .entry(room_id.clone())
                    .or_insert_with(|| {
                        info!("Creating new room: {}", room_id);
                        Arc::new(Room::new(room_id.clone(), bounds))
                    })
                    .value(),
            );

            match room.admit(member) {
                Ok(snapshot) => return snapshot,
                Err(returned) => {
                    debug!("Room {} was reclaimed mid-join, retrying", room_id);
                    member = returned;
                }
            }
        }
    }

    /// Removes a session and broadcasts `ParticipantLeft` to whoever remains.
    pub fn remove_from_room(&self, room_id: &RoomId, session_id: SessionId) -> bool {
        let Some(room) = self.room(room_id) else {
            return false;
        };

        let Some(member) = room.evict(session_id) else {
            return false;
        };
        info!("User {} left room {}", member.identity.user_id, room_id);

        if self.policy == ReclaimPolicy::ReapWhenEmpty {
            let reaped = self
                .rooms
                .remove_if(room_id, |_, current| {
                    Arc::ptr_eq(current, &room) && current.retire_if_empty()
                })
                .is_some();
            if reaped {
                info!("Room {} is empty, reclaimed", room_id);
            }
        }
        true
    }

    /// Sends `msg` to every member of the room except `exclude`.
    pub fn broadcast(&self, room_id: &RoomId, exclude: SessionId, msg: &ServerMessage) -> usize {
        self.room(room_id)
            .map(|room| room.broadcast(exclude, msg))
            .unwrap_or(0)
    }

    pub fn is_member(&self, room_id: &RoomId, session_id: SessionId) -> bool {
        self.room(room_id)
            .is_some_and(|room| room.contains_session(session_id))
    }

    pub fn list_members(&self, room_id: &RoomId) -> Vec<MemberSnapshot> {
        self.room(room_id)
            .map(|room| room.snapshot())
            .unwrap_or_default()
    }

    /// Stores an accepted position and broadcasts `Movement` to the others.
    pub fn move_member(&self, room_id: &RoomId, session_id: SessionId, to: GridPosition) -> bool {
        self.room(room_id)
            .map(|room| room.relocate(session_id, to))
            .unwrap_or(false)
    }

    pub fn send_to_user(&self, room_id: &RoomId, user_id: &UserId, msg: &ServerMessage) -> usize {
        self.room(room_id)
            .map(|room| room.send_to_user(user_id, msg))
            .unwrap_or(0)
    }

    pub fn participants(&self, room_id: &RoomId) -> Vec<Identity> {
        self.room(room_id)
            .map(|room| room.profiles())
            .unwrap_or_default()
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn room(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.get(room_id).map(|r| Arc::clone(r.value()))
    }
}
