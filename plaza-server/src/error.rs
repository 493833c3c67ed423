use crate::collaborators::{AuthError, DirectoryError};
use plaza_core::RoomId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error("room '{0}' not found")]
    RoomNotFound(RoomId),

    #[error("room directory failure: {0}")]
    Directory(DirectoryError),

    #[error("session replaced by a newer join of the same user")]
    Superseded,

    #[error("protocol violation: {0}")]
    ProtocolViolation(String),
}

impl GatewayError {
    /// Whether the connection must be dropped without a response.
    pub fn closes_connection(&self) -> bool {
        !matches!(self, GatewayError::ProtocolViolation(_))
    }
}

impl From<DirectoryError> for GatewayError {
    fn from(e: DirectoryError) -> Self {
        match e {
            DirectoryError::NotFound(room_id) => GatewayError::RoomNotFound(room_id),
            other => GatewayError::Directory(other),
        }
    }
}
