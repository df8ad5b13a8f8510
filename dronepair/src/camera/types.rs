//! Camera pose and anchor types.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::coord::{geodetic_to_ecef, Coordinate, EnuFrame};

/// The ground landmark both views must see.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub coordinate: Coordinate,
    /// Height above the ellipsoid in meters.
    pub height_m: f64,
    /// Earth-centered, Earth-fixed position in meters.
    pub position: DVec3,
}

impl Anchor {
    /// Anchor on the ellipsoid surface.
    pub fn new(coordinate: Coordinate) -> Self {
        Self::at_height(coordinate, 0.0)
    }

    /// Anchor raised `height_m` above the ellipsoid.
    pub fn at_height(coordinate: Coordinate, height_m: f64) -> Self {
        Self {
            coordinate,
            height_m,
            position: geodetic_to_ecef(coordinate, height_m),
        }
    }
}

/// Position and look-at orientation of one camera.
///
/// Angles are in radians. `heading` is measured in the camera's local
/// east-north-up frame from east towards north; `pitch` is positive above
/// the horizon. `roll` is always zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    /// Earth-centered, Earth-fixed position in meters.
    pub position: DVec3,
    pub coordinate: Coordinate,
    /// Height above the anchor's ground level in meters.
    pub height_m: f64,
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
    /// Compass bearing from the anchor to the camera in degrees [0, 360).
    pub bearing_deg: f64,
    /// Horizontal distance from the anchor in meters.
    pub distance_m: f64,
}

impl CameraPose {
    pub fn heading_deg(&self) -> f64 {
        self.heading.to_degrees()
    }

    pub fn pitch_deg(&self) -> f64 {
        self.pitch.to_degrees()
    }

    /// Unit viewing direction in world (ECEF) coordinates.
    pub fn forward(&self) -> DVec3 {
        let (sin_h, cos_h) = self.heading.sin_cos();
        let (sin_p, cos_p) = self.pitch.sin_cos();
        let local = DVec3::new(cos_p * cos_h, cos_p * sin_h, sin_p);
        EnuFrame::at(self.coordinate).to_world(local)
    }
}

/// The two camera poses of one generation cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPair {
    pub first: CameraPose,
    pub second: CameraPose,
}

impl CameraPair {
    /// Smallest angle between the two bearings, in degrees [0, 180].
    pub fn bearing_difference_deg(&self) -> f64 {
        bearing_difference_deg(self.first.bearing_deg, self.second.bearing_deg)
    }

    pub fn poses(&self) -> [&CameraPose; 2] {
        [&self.first, &self.second]
    }
}

/// Smallest angle between two compass bearings, in degrees [0, 180].
pub fn bearing_difference_deg(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}
