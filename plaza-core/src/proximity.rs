use crate::model::GridPosition;

/// Distance bands used to weight a remote peer's audio and video.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProximityThresholds {
    /// Full weight up to and including this distance.
    pub near: u32,
    /// Half weight up to and including this distance, zero beyond.
    pub far: u32,
}

impl Default for ProximityThresholds {
    fn default() -> Self {
        Self { near: 2, far: 4 }
    }
}

/// Returns 1.0, 0.5 or 0.0 depending on the grid distance between two cells.
pub fn proximity_weight(
    local: GridPosition,
    remote: GridPosition,
    thresholds: ProximityThresholds,
) -> f32 {
    let distance = local.chebyshev_distance(&remote);
    if distance <= thresholds.near {
        1.0
    } else if distance <= thresholds.far {
        0.5
    } else {
        0.0
    }
}
