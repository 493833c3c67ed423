use crate::readiness::ReadinessStep;
use crate::state::ConnectionState;
use plaza_core::{GridPosition, UserId};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ClientError {
    #[error("Not ready to join, waiting on {0:?}")]
    NotReady(Vec<ReadinessStep>),

    #[error("Operation needs state {expected:?} but controller is {actual:?}")]
    InvalidState {
        expected: ConnectionState,
        actual: ConnectionState,
    },

    #[error("Illegal move from {from:?} to {to:?}")]
    IllegalMove { from: GridPosition, to: GridPosition },

    #[error("Socket error: {0}")]
    Socket(String),

    #[error("Scene error: {0}")]
    Scene(String),

    #[error(transparent)]
    Asset(#[from] AssetError),

    #[error("Cancelled by reset")]
    Cancelled,

    #[error("Controller was destroyed")]
    Destroyed,
}

/// Asset failures never tear the visit down; they only fail a readiness step.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Failed to load {url}: {reason}")]
pub struct AssetError {
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MediaError {
    #[error("Negotiation failed: {0}")]
    Negotiation(String),

    #[error("No peer connection for {0}")]
    UnknownPeer(UserId),

    #[error("Signaling failed: {0}")]
    Signaling(String),
}

impl From<ClientError> for MediaError {
    fn from(e: ClientError) -> Self {
        MediaError::Signaling(e.to_string())
    }
}
