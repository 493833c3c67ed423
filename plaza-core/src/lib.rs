pub mod model;
pub mod movement;
pub mod proximity;

pub use model::*;
pub use movement::MovementValidator;
pub use proximity::{ProximityThresholds, proximity_weight};
