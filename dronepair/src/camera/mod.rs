//! Camera pair synthesis around a landmark anchor.

mod placer;
mod types;

pub use placer::{
    look_at, CameraPlacer, PlacementConfig, PlacementError, DEFAULT_MAX_ANGLE_DIFF_DEG,
    DEFAULT_MAX_DISTANCE_M, DEFAULT_MAX_HEIGHT_M, DEFAULT_MIN_ANGLE_DIFF_DEG,
    DEFAULT_MIN_DISTANCE_M, DEFAULT_MIN_HEIGHT_M,
};
pub use types::{bearing_difference_deg, Anchor, CameraPair, CameraPose};
