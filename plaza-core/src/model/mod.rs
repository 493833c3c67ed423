mod position;
mod protocol;
mod room;
mod session;
mod user;

pub use position::GridPosition;
pub use protocol::{ClientMessage, MemberSnapshot, ServerMessage, SignalKind};
pub use room::{RoomBounds, RoomId};
pub use session::SessionId;
pub use user::UserId;
