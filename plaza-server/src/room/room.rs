use crate::collaborators::Identity;
use crate::session::SessionSender;
use parking_lot::Mutex;
use plaza_core::{GridPosition, MemberSnapshot, RoomBounds, RoomId, ServerMessage, SessionId, UserId};
use std::collections::HashMap;
use tracing::debug;

/// A joined session as the room sees it.
#[derive(Clone)]
pub struct RoomMember {
    pub session_id: SessionId,
    pub identity: Identity,
    pub position: GridPosition,
    pub sender: SessionSender,
}

impl RoomMember {
    fn snapshot(&self) -> MemberSnapshot {
        MemberSnapshot::new(self.identity.user_id.clone(), self.position)
    }

    fn deliver(&self, msg: ServerMessage) {
        if self.sender.send(msg).is_err() {
            debug!("Dropping message for closed session {}", self.session_id);
        }
    }
}

struct Members {
    entries: HashMap<SessionId, RoomMember>,
    /// Set once the registry has unlinked this room; no one may enter it again.
    retired: bool,
}

impl Members {
    fn deliver_except(&self, exclude: Option<SessionId>, msg: &ServerMessage) -> usize {
        let mut delivered = 0;
        for (session_id, member) in &self.entries {
            if Some(*session_id) == exclude {
                continue;
            }
            member.deliver(msg.clone());
            delivered += 1;
        }
        delivered
    }
}

/// One shared space and its current occupants.
///
/// Every mutation and every fan-out happens while holding the member lock,
/// so a broadcast always sees a whole membership set and per-recipient
/// ordering matches the order in which mutations were applied.
pub struct Room {
    id: RoomId,
    bounds: RoomBounds,
    members: Mutex<Members>,
}

impl Room {
    pub fn new(id: RoomId, bounds: RoomBounds) -> Self {
        Self {
            id,
            bounds,
            members: Mutex::new(Members {
                entries: HashMap::new(),
                retired: false,
            }),
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    pub fn bounds(&self) -> RoomBounds {
        self.bounds
    }

    /// Registers `member`, sends it the join snapshot and announces it to
    /// everyone else. Hands the member back if the room has been retired.
    ///
    /// An older session of the same user is dropped from the room first, and
    /// the others hear it leave before the new one arrives.
    pub(crate) fn admit(&self, member: RoomMember) -> Result<Vec<MemberSnapshot>, RoomMember> {
        let mut members = self.members.lock();
        if members.retired {
            return Err(member);
        }

        let superseded: Vec<SessionId> = members
            .entries
            .values()
            .filter(|m| {
                m.identity.user_id == member.identity.user_id && m.session_id != member.session_id
            })
            .map(|m| m.session_id)
            .collect();
        if !superseded.is_empty() {
            for session_id in &superseded {
                debug!("Session {} superseded by {}", session_id, member.session_id);
                members.entries.remove(session_id);
            }
            let notice = ServerMessage::ParticipantLeft {
                user_id: member.identity.user_id.clone(),
            };
            members.deliver_except(None, &notice);
        }

        let snapshot: Vec<MemberSnapshot> = members
            .entries
            .values()
            .filter(|m| m.session_id != member.session_id)
            .map(RoomMember::snapshot)
            .collect();

        member.deliver(ServerMessage::SpaceJoined {
            spawn: member.position,
            user_id: member.identity.user_id.clone(),
            users: snapshot.clone(),
        });

        let announcement = ServerMessage::ParticipantJoined {
            user_id: member.identity.user_id.clone(),
            x: member.position.x,
            y: member.position.y,
        };
        members.deliver_except(Some(member.session_id), &announcement);

        members.entries.insert(member.session_id, member);
        Ok(snapshot)
    }

    /// Removes a session and tells the rest of the room it left.
    /// Returns the removed member, if it was present.
    pub(crate) fn evict(&self, session_id: SessionId) -> Option<RoomMember> {
        let mut members = self.members.lock();
        let member = members.entries.remove(&session_id)?;

        let notice = ServerMessage::ParticipantLeft {
            user_id: member.identity.user_id.clone(),
        };
        members.deliver_except(None, &notice);

        Some(member)
    }

    pub(crate) fn relocate(&self, session_id: SessionId, position: GridPosition) -> bool {
        let mut members = self.members.lock();
        let Some(member) = members.entries.get_mut(&session_id) else {
            return false;
        };
        member.position = position;

        let movement = ServerMessage::Movement {
            user_id: member.identity.user_id.clone(),
            x: position.x,
            y: position.y,
        };
        members.deliver_except(Some(session_id), &movement);
        true
    }

    pub fn broadcast(&self, exclude: SessionId, msg: &ServerMessage) -> usize {
        self.members.lock().deliver_except(Some(exclude), msg)
    }

    /// Delivers to every session of `user_id` in this room.
    pub fn send_to_user(&self, user_id: &UserId, msg: &ServerMessage) -> usize {
        let members = self.members.lock();
        let mut delivered = 0;
        for member in members.entries.values() {
            if &member.identity.user_id == user_id {
                member.deliver(msg.clone());
                delivered += 1;
            }
        }
        delivered
    }

    pub fn contains_session(&self, session_id: SessionId) -> bool {
        self.members.lock().entries.contains_key(&session_id)
    }

    pub fn contains_user(&self, user_id: &UserId) -> bool {
        self.members
            .lock()
            .entries
            .values()
            .any(|m| &m.identity.user_id == user_id)
    }

    pub fn snapshot(&self) -> Vec<MemberSnapshot> {
        self.members
            .lock()
            .entries
            .values()
            .map(RoomMember::snapshot)
            .collect()
    }

    pub fn profiles(&self) -> Vec<Identity> {
        self.members
            .lock()
            .entries
            .values()
            .map(|m| m.identity.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.members.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Marks the room retired when nobody is left in it.
    pub(crate) fn retire_if_empty(&self) -> bool {
        let mut members = self.members.lock();
        if members.entries.is_empty() {
            members.retired = true;
        }
        members.retired
    }
}
