//! Resolved landmark locations and the random source that produces them.

mod source;
mod types;

pub use source::{FlightGuard, LocationSource};
pub use types::{JitterConfig, ResolvedLocation, DEFAULT_JITTER_MAX_M, DEFAULT_JITTER_PROBABILITY};

#[cfg(test)]
pub use source::tests::test_source;
