//! Uniform coordinate sampling inside configured regions.

use rand::Rng;

use super::types::{Coordinate, Region};

/// Picks random coordinates from a fixed set of regions.
///
/// A region is chosen uniformly (not weighted by area), then a coordinate is
/// drawn uniformly in latitude and longitude inside its bounds.
#[derive(Debug, Clone)]
pub struct RegionSampler {
    regions: Vec<Region>,
}

impl RegionSampler {
    /// Creates a sampler. Returns `None` when `regions` is empty.
    pub fn new(regions: Vec<Region>) -> Option<Self> {
        if regions.is_empty() {
            None
        } else {
            Some(Self { regions })
        }
    }

    /// The regions this sampler draws from.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Picks a region uniformly at random.
    pub fn pick_region<R: Rng + ?Sized>(&self, rng: &mut R) -> &Region {
        let index = rng.random_range(0..self.regions.len());
        &self.regions[index]
    }

    /// Draws a coordinate uniformly inside `region`.
    pub fn sample_in<R: Rng + ?Sized>(region: &Region, rng: &mut R) -> Coordinate {
        let lat = rng.random_range(region.min_lat..=region.max_lat);
        let lon = rng.random_range(region.min_lon..=region.max_lon);
        Coordinate::new(lat, lon)
    }

    /// Picks a region and a coordinate inside it.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> (&Region, Coordinate) {
        let region = self.pick_region(rng);
        let coord = Self::sample_in(region, rng);
        (region, coord)
    }
}
