//! Two-camera placement around an anchor.
//!
//! # Placement
//!
//! ```text
//!                 N
//!                 ▲      cam1 (bearing b1, distance d1, height h1)
//!                 │     ╱
//!                 │    ╱
//!        anchor ──●───╱──────► E
//!                  ╲
//!                   ╲  cam2 (bearing b1 ± Δ, Δ ∈ [min_angle_diff, max_angle_diff])
//! ```
//!
//! Each camera is offset from the anchor on the ground plane with the
//! equirectangular approximation, raised to its height, and converted to
//! ECEF. Its orientation is the exact look-at towards the anchor expressed
//! in the camera's own east-north-up frame.

use glam::DVec3;
use rand::Rng;
use thiserror::Error;

use super::types::{Anchor, CameraPair, CameraPose};
use crate::coord::{geodetic_to_ecef, offset_by_meters, Coordinate, EnuFrame};

pub const DEFAULT_MIN_HEIGHT_M: f64 = 60.0;
pub const DEFAULT_MAX_HEIGHT_M: f64 = 150.0;
pub const DEFAULT_MIN_DISTANCE_M: f64 = 100.0;
pub const DEFAULT_MAX_DISTANCE_M: f64 = 300.0;
pub const DEFAULT_MIN_ANGLE_DIFF_DEG: f64 = 30.0;
pub const DEFAULT_MAX_ANGLE_DIFF_DEG: f64 = 120.0;

/// Invalid placement configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("{name}: minimum {min} exceeds maximum {max}")]
    InvertedRange {
        name: &'static str,
        min: f64,
        max: f64,
    },

    #[error("{name} must be {requirement}, got {value}")]
    OutOfBounds {
        name: &'static str,
        requirement: &'static str,
        value: f64,
    },
}

/// Ranges the two camera poses are drawn from.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacementConfig {
    pub min_height_m: f64,
    pub max_height_m: f64,
    pub min_distance_m: f64,
    pub max_distance_m: f64,
    pub min_angle_diff_deg: f64,
    pub max_angle_diff_deg: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            min_height_m: DEFAULT_MIN_HEIGHT_M,
            max_height_m: DEFAULT_MAX_HEIGHT_M,
            min_distance_m: DEFAULT_MIN_DISTANCE_M,
            max_distance_m: DEFAULT_MAX_DISTANCE_M,
            min_angle_diff_deg: DEFAULT_MIN_ANGLE_DIFF_DEG,
            max_angle_diff_deg: DEFAULT_MAX_ANGLE_DIFF_DEG,
        }
    }
}

impl PlacementConfig {
    /// Checks that every range is finite, ordered and within its bounds.
    pub fn validate(&self) -> Result<(), PlacementError> {
        check_range("height", self.min_height_m, self.max_height_m)?;
        check_range("distance", self.min_distance_m, self.max_distance_m)?;
        check_range("angle difference", self.min_angle_diff_deg, self.max_angle_diff_deg)?;

        if self.min_height_m <= 0.0 {
            return Err(PlacementError::OutOfBounds {
                name: "min_height_m",
                requirement: "positive",
                value: self.min_height_m,
            });
        }
        if self.min_distance_m < 0.0 {
            return Err(PlacementError::OutOfBounds {
                name: "min_distance_m",
                requirement: "non-negative",
                value: self.min_distance_m,
            });
        }
        if self.min_angle_diff_deg < 0.0 {
            return Err(PlacementError::OutOfBounds {
                name: "min_angle_diff_deg",
                requirement: "within [0, 180]",
                value: self.min_angle_diff_deg,
            });
        }
        if self.max_angle_diff_deg > 180.0 {
            return Err(PlacementError::OutOfBounds {
                name: "max_angle_diff_deg",
                requirement: "within [0, 180]",
                value: self.max_angle_diff_deg,
            });
        }
        Ok(())
    }
}

fn check_range(name: &'static str, min: f64, max: f64) -> Result<(), PlacementError> {
    if !min.is_finite() || !max.is_finite() {
        return Err(PlacementError::OutOfBounds {
            name,
            requirement: "finite",
            value: if min.is_finite() { max } else { min },
        });
    }
    if min > max {
        return Err(PlacementError::InvertedRange { name, min, max });
    }
    Ok(())
}

/// Places camera pairs around anchors.
#[derive(Debug, Clone)]
pub struct CameraPlacer {
    config: PlacementConfig,
}

impl CameraPlacer {
    /// Creates a placer after validating `config`.
    pub fn new(config: PlacementConfig) -> Result<Self, PlacementError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlacementConfig {
        &self.config
    }

    /// Draws two poses around `anchor`.
    ///
    /// Heights and distances are independent per camera. Camera 2's bearing
    /// differs from camera 1's by a uniform amount inside the configured
    /// angle range, on a random side.
    pub fn place<R: Rng + ?Sized>(&self, anchor: &Anchor, rng: &mut R) -> CameraPair {
        let c = &self.config;

        let bearing1 = rng.random_range(0.0..360.0);
        let diff = rng.random_range(c.min_angle_diff_deg..=c.max_angle_diff_deg);
        let sign = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
        let bearing2 = (bearing1 + sign * diff).rem_euclid(360.0);

        let first = self.pose_at(
            anchor,
            bearing1,
            rng.random_range(c.min_distance_m..=c.max_distance_m),
            rng.random_range(c.min_height_m..=c.max_height_m),
        );
        let second = self.pose_at(
            anchor,
            bearing2,
            rng.random_range(c.min_distance_m..=c.max_distance_m),
            rng.random_range(c.min_height_m..=c.max_height_m),
        );

        CameraPair { first, second }
    }

    /// Pose at a given compass bearing, ground distance and height from `anchor`.
    pub fn pose_at(
        &self,
        anchor: &Anchor,
        bearing_deg: f64,
        distance_m: f64,
        height_m: f64,
    ) -> CameraPose {
        let (sin_b, cos_b) = bearing_deg.to_radians().sin_cos();
        let coordinate =
            offset_by_meters(anchor.coordinate, distance_m * sin_b, distance_m * cos_b);
        let position = geodetic_to_ecef(coordinate, anchor.height_m + height_m);
        let (heading, pitch) = look_at(coordinate, position, anchor.position);

        CameraPose {
            position,
            coordinate,
            height_m,
            heading,
            pitch,
            roll: 0.0,
            bearing_deg: bearing_deg.rem_euclid(360.0),
            distance_m,
        }
    }
}

/// Heading and pitch (radians) of the ray from `eye` towards `target`.
///
/// The unit direction is expressed in the east-north-up frame at
/// `eye_coord`; heading = atan2(north, east), pitch = asin(up).
pub fn look_at(eye_coord: Coordinate, eye: DVec3, target: DVec3) -> (f64, f64) {
    let direction = (target - eye).normalize_or_zero();
    let local = EnuFrame::at(eye_coord).to_local(direction);
    let heading = local.y.atan2(local.x);
    let pitch = local.z.clamp(-1.0, 1.0).asin();
    (heading, pitch)
}
