//! Caching of resolved landmark locations.
//!
//! The lookup service is slow and rate limited, so every resolved building
//! center is remembered under its rounded query coordinate. See
//! [`LocationCache`] for the eviction policy.

mod location;

pub use location::{
    CacheKey, LocationCache, LocationCacheStats, DEFAULT_MAX_ENTRIES, EVICTION_FRACTION,
};
