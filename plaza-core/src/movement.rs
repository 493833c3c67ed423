use crate::model::GridPosition;

/// Step-size rule for server-side movement checks.
///
/// A proposed cell is reachable when it differs from the last accepted cell
/// by at most one in each axis. Walls and terrain are not consulted here;
/// those stay a client-side concern.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementValidator;

impl MovementValidator {
    pub const MAX_STEP: u32 = 1;

    pub fn accepts(last: GridPosition, proposed: GridPosition) -> bool {
        last.x.abs_diff(proposed.x) <= Self::MAX_STEP
            && last.y.abs_diff(proposed.y) <= Self::MAX_STEP
    }
}
