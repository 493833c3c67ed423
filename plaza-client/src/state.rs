/// Where a room visit stands from the client's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Joining,
    Joined,
}

impl ConnectionState {
    pub fn is_joined(&self) -> bool {
        matches!(self, ConnectionState::Joined)
    }
}

/// Media link status as shown to the UI for one remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationStatus {
    Negotiating,
    Connected,
    /// The link failed and a fresh negotiation is under way.
    Reconnecting,
    Closed,
}
