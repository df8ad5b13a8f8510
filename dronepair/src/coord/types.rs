//! Coordinate and region types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Errors raised while validating geographic inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    #[error("invalid latitude: {0} (must be between -90 and 90)")]
    InvalidLatitude(f64),

    #[error("invalid longitude: {0} (must be between -180 and 180)")]
    InvalidLongitude(f64),

    #[error("region '{name}' has an empty {axis} span ({min} >= {max})")]
    EmptySpan {
        name: String,
        axis: &'static str,
        min: f64,
        max: f64,
    },
}

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    /// Creates a coordinate without validation.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Creates a coordinate, rejecting out-of-range values.
    pub fn checked(lat: f64, lon: f64) -> Result<Self, CoordError> {
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(CoordError::InvalidLatitude(lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(CoordError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Great-circle distance to `other` in meters (haversine).
    pub fn distance_m(&self, other: &Coordinate) -> f64 {
        let phi1 = self.lat.to_radians();
        let phi2 = other.lat.to_radians();
        let d_phi = (other.lat - self.lat).to_radians();
        let d_lambda = (other.lon - self.lon).to_radians();

        let a = (d_phi / 2.0).sin().powi(2)
            + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }

    /// Display name in the "lat,lon" form handed to the exporter.
    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6},{:.6}", self.lat, self.lon)
    }
}

/// A named geographic bounding box that coordinates are sampled from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Region {
    /// Creates a validated region.
    pub fn new(
        name: impl Into<String>,
        min_lat: f64,
        max_lat: f64,
        min_lon: f64,
        max_lon: f64,
    ) -> Result<Self, CoordError> {
        let region = Self {
            name: name.into(),
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        };
        region.validate()?;
        Ok(region)
    }

    /// Checks bounds are in range and non-empty on both axes.
    pub fn validate(&self) -> Result<(), CoordError> {
        Coordinate::checked(self.min_lat, self.min_lon)?;
        Coordinate::checked(self.max_lat, self.max_lon)?;
        if self.min_lat >= self.max_lat {
            return Err(CoordError::EmptySpan {
                name: self.name.clone(),
                axis: "latitude",
                min: self.min_lat,
                max: self.max_lat,
            });
        }
        if self.min_lon >= self.max_lon {
            return Err(CoordError::EmptySpan {
                name: self.name.clone(),
                axis: "longitude",
                min: self.min_lon,
                max: self.max_lon,
            });
        }
        Ok(())
    }

    /// Whether `coord` falls inside the box (inclusive).
    pub fn contains(&self, coord: &Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coord.lat)
            && (self.min_lon..=self.max_lon).contains(&coord.lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checked_rejects_out_of_range() {
        assert!(matches!(
            Coordinate::checked(91.0, 0.0),
            Err(CoordError::InvalidLatitude(_))
        ));
        assert!(matches!(
            Coordinate::checked(0.0, -181.0),
            Err(CoordError::InvalidLongitude(_))
        ));
        assert!(Coordinate::checked(48.0, 2.0).is_ok());
    }

    #[test]
    fn test_display_is_decimal_lat_lon() {
        let coord = Coordinate::new(48.0, 2.0);
        assert_eq!(coord.display_name(), "48.000000,2.000000");
    }

    #[test]
    fn test_distance_paris_to_london() {
        let paris = Coordinate::new(48.8566, 2.3522);
        let london = Coordinate::new(51.5074, -0.1278);
        let d = paris.distance_m(&london);
        // ~343.5 km
        assert!((d - 343_500.0).abs() < 2_000.0, "distance was {}", d);
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let c = Coordinate::new(-33.86, 151.2);
        assert!(c.distance_m(&c) < 1e-6);
    }

    #[test]
    fn test_region_rejects_empty_span() {
        let err = Region::new("flat", 10.0, 10.0, 0.0, 1.0).unwrap_err();
        assert!(matches!(err, CoordError::EmptySpan { axis: "latitude", .. }));

        let err = Region::new("thin", 0.0, 1.0, 5.0, 4.0).unwrap_err();
        assert!(matches!(err, CoordError::EmptySpan { axis: "longitude", .. }));
    }

    #[test]
    fn test_region_contains() {
        let region = Region::new("europe", 43.0, 52.0, -5.0, 10.0).unwrap();
        assert!(region.contains(&Coordinate::new(48.0, 2.0)));
        assert!(!region.contains(&Coordinate::new(40.0, 2.0)));
    }
}
