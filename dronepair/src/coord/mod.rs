//! Geographic coordinate helpers
//!
//! Provides the coordinate and region types, uniform sampling inside
//! configured regions, and the small amount of geodesy the camera placer
//! needs: planar meter offsets, WGS84 Earth-centered coordinates and local
//! east-north-up frames.

mod sampler;
mod types;

pub use sampler::RegionSampler;
pub use types::{
    CoordError, Coordinate, Region, EARTH_RADIUS_M, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON,
};

use glam::DVec3;

/// Meters per degree of latitude in the equirectangular approximation.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// WGS84 semi-major axis in meters.
pub const WGS84_A: f64 = 6_378_137.0;

/// WGS84 first eccentricity squared.
pub const WGS84_E2: f64 = 6.694_379_990_14e-3;

/// Offsets a coordinate by a planar displacement in meters.
///
/// Uses the equirectangular approximation: one degree of latitude is
/// [`METERS_PER_DEGREE`], and longitude displacement is scaled by
/// `cos(latitude)`. Accurate to well under a meter for offsets of a few
/// hundred meters away from the poles.
///
/// # Arguments
///
/// * `origin` - Starting coordinate
/// * `east_m` - Displacement towards east in meters (negative = west)
/// * `north_m` - Displacement towards north in meters (negative = south)
#[inline]
pub fn offset_by_meters(origin: Coordinate, east_m: f64, north_m: f64) -> Coordinate {
    let d_lat = north_m / METERS_PER_DEGREE;
    let cos_lat = origin.lat.to_radians().cos().max(1e-9);
    let d_lon = east_m / (METERS_PER_DEGREE * cos_lat);
    Coordinate::new(origin.lat + d_lat, origin.lon + d_lon)
}

/// Displaces a coordinate by `distance_m` along a polar `angle_rad`.
///
/// The angle is measured counter-clockwise from east, matching the jitter
/// convention: `east = d·cos(θ)`, `north = d·sin(θ)`.
#[inline]
pub fn displace_polar(origin: Coordinate, angle_rad: f64, distance_m: f64) -> Coordinate {
    offset_by_meters(
        origin,
        distance_m * angle_rad.cos(),
        distance_m * angle_rad.sin(),
    )
}

/// Converts geodetic coordinates to Earth-centered, Earth-fixed meters.
///
/// # Arguments
///
/// * `coord` - Latitude/longitude in degrees
/// * `height_m` - Height above the WGS84 ellipsoid in meters
pub fn geodetic_to_ecef(coord: Coordinate, height_m: f64) -> DVec3 {
    let lat = coord.lat.to_radians();
    let lon = coord.lon.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    // Prime vertical radius of curvature
    let n = WGS84_A / (1.0 - WGS84_E2 * sin_lat * sin_lat).sqrt();

    DVec3::new(
        (n + height_m) * cos_lat * cos_lon,
        (n + height_m) * cos_lat * sin_lon,
        (n * (1.0 - WGS84_E2) + height_m) * sin_lat,
    )
}

/// Local east-north-up frame at a geodetic position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnuFrame {
    pub east: DVec3,
    pub north: DVec3,
    pub up: DVec3,
}

impl EnuFrame {
    /// Builds the ENU basis vectors (in ECEF) at `coord`.
    pub fn at(coord: Coordinate) -> Self {
        let lat = coord.lat.to_radians();
        let lon = coord.lon.to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();
        let (sin_lon, cos_lon) = lon.sin_cos();

        Self {
            east: DVec3::new(-sin_lon, cos_lon, 0.0),
            north: DVec3::new(-sin_lat * cos_lon, -sin_lat * sin_lon, cos_lat),
            up: DVec3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat),
        }
    }

    /// Expresses an ECEF vector in this frame's (east, north, up) components.
    #[inline]
    pub fn to_local(&self, v: DVec3) -> DVec3 {
        DVec3::new(v.dot(self.east), v.dot(self.north), v.dot(self.up))
    }

    /// Converts local (east, north, up) components back to an ECEF vector.
    #[inline]
    pub fn to_world(&self, local: DVec3) -> DVec3 {
        self.east * local.x + self.north * local.y + self.up * local.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_north_one_degree() {
        let origin = Coordinate::new(10.0, 20.0);
        let moved = offset_by_meters(origin, 0.0, METERS_PER_DEGREE);
        assert!((moved.lat - 11.0).abs() < 1e-12);
        assert!((moved.lon - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_offset_east_scaled_by_latitude() {
        // At 60° latitude a degree of longitude is half as long
        let origin = Coordinate::new(60.0, 0.0);
        let moved = offset_by_meters(origin, METERS_PER_DEGREE / 2.0, 0.0);
        assert!((moved.lon - 1.0).abs() < 1e-9, "lon was {}", moved.lon);
    }

    #[test]
    fn test_displace_polar_distance() {
        let origin = Coordinate::new(48.0, 2.0);
        let moved = displace_polar(origin, 1.0, 150.0);
        let d = origin.distance_m(&moved);
        assert!((d - 150.0).abs() < 1.0, "distance was {}", d);
    }

    #[test]
    fn test_ecef_equator_prime_meridian() {
        let p = geodetic_to_ecef(Coordinate::new(0.0, 0.0), 0.0);
        assert!((p.x - WGS84_A).abs() < 1e-6);
        assert!(p.y.abs() < 1e-6);
        assert!(p.z.abs() < 1e-6);
    }

    #[test]
    fn test_ecef_height_moves_along_up() {
        let coord = Coordinate::new(48.0, 2.0);
        let ground = geodetic_to_ecef(coord, 0.0);
        let raised = geodetic_to_ecef(coord, 100.0);
        let local = EnuFrame::at(coord).to_local(raised - ground);
        assert!((local.z - 100.0).abs() < 1e-6);
        assert!(local.x.abs() < 1e-6);
        assert!(local.y.abs() < 1e-6);
    }

    #[test]
    fn test_enu_frame_is_orthonormal() {
        let frame = EnuFrame::at(Coordinate::new(-33.9, 151.2));
        assert!((frame.east.length() - 1.0).abs() < 1e-12);
        assert!((frame.north.length() - 1.0).abs() < 1e-12);
        assert!((frame.up.length() - 1.0).abs() < 1e-12);
        assert!(frame.east.dot(frame.north).abs() < 1e-12);
        assert!(frame.east.dot(frame.up).abs() < 1e-12);
        assert!(frame.north.dot(frame.up).abs() < 1e-12);
    }

    #[test]
    fn test_enu_roundtrip() {
        let frame = EnuFrame::at(Coordinate::new(35.0, 139.0));
        let local = DVec3::new(12.0, -7.5, 300.0);
        let back = frame.to_local(frame.to_world(local));
        assert!((back - local).length() < 1e-9);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_polar_displacement_stays_within_distance(
                lat in -70.0..70.0_f64,
                lon in -179.0..179.0_f64,
                angle in 0.0..std::f64::consts::TAU,
                distance in 0.0..200.0_f64
            ) {
                let origin = Coordinate::new(lat, lon);
                let moved = displace_polar(origin, angle, distance);
                let d = origin.distance_m(&moved);
                prop_assert!(
                    d <= distance * 1.01 + 0.5,
                    "moved {} m for a requested {} m", d, distance
                );
            }
        }
    }
}
