//! Resolved location record and jitter rule.

use std::f64::consts::TAU;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::clock::age_of;
use crate::coord::{displace_polar, Coordinate};

/// Default probability that a resolved landmark is jittered.
pub const DEFAULT_JITTER_PROBABILITY: f64 = 0.5;

/// Default maximum jitter distance in meters.
pub const DEFAULT_JITTER_MAX_M: f64 = 200.0;

/// A landmark location ready to be handed to the camera placer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub coordinate: Coordinate,
    /// Region the originating sample was drawn from.
    pub region: Option<String>,
    /// "lat,lon" display name.
    pub name: String,
    pub generated_at: DateTime<Utc>,
}

impl ResolvedLocation {
    /// Builds a record named after its coordinate.
    pub fn new(coordinate: Coordinate, region: Option<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            name: coordinate.display_name(),
            coordinate,
            region,
            generated_at,
        }
    }

    /// Time elapsed since generation.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        age_of(self.generated_at, now)
    }

    /// Whether the record is older than `max_age`.
    pub fn is_older_than(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        self.age(now) > max_age
    }
}

/// Random planar offset applied to resolved building centers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitterConfig {
    /// Chance in [0, 1] that a location is displaced at all.
    pub probability: f64,
    /// Upper bound on the displacement in meters.
    pub max_distance_m: f64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            probability: DEFAULT_JITTER_PROBABILITY,
            max_distance_m: DEFAULT_JITTER_MAX_M,
        }
    }
}

impl JitterConfig {
    /// No displacement ever.
    pub fn disabled() -> Self {
        Self {
            probability: 0.0,
            max_distance_m: 0.0,
        }
    }

    /// Applies the jitter rule to `center`.
    ///
    /// With `probability`, picks a uniform angle and a uniform distance up to
    /// `max_distance_m` and displaces the point; otherwise returns it as is.
    pub fn apply<R: Rng + ?Sized>(&self, center: Coordinate, rng: &mut R) -> Coordinate {
        let probability = self.probability.clamp(0.0, 1.0);
        if self.max_distance_m <= 0.0 || !rng.random_bool(probability) {
            return center;
        }
        let angle = rng.random_range(0.0..TAU);
        let distance = rng.random_range(0.0..=self.max_distance_m);
        displace_polar(center, angle, distance)
    }
}
