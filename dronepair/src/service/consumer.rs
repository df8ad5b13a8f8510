//! Consumer-side tuning for location generation.

use std::time::Duration;

/// Chance of taking a random queued entry instead of the head.
pub const DEFAULT_RANDOM_PICK_PROBABILITY: f64 = 0.2;

/// Random picks only happen with more than this many entries queued.
pub const DEFAULT_RANDOM_PICK_MIN_QUEUED: usize = 10;

/// Queued entries older than this are discarded at consumption (2 hours).
pub const DEFAULT_CONSUME_MAX_AGE: Duration = Duration::from_secs(2 * 60 * 60);

/// Synchronous fallback attempts before giving up.
pub const DEFAULT_SYNC_ATTEMPTS: u32 = 5;

/// Deadline for each synchronous attempt.
pub const DEFAULT_SYNC_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// How [`LocationService`](super::LocationService) hands out locations.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumerConfig {
    pub random_pick_probability: f64,
    pub random_pick_min_queued: usize,
    pub max_age: Duration,
    pub sync_attempts: u32,
    pub sync_attempt_timeout: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            random_pick_probability: DEFAULT_RANDOM_PICK_PROBABILITY,
            random_pick_min_queued: DEFAULT_RANDOM_PICK_MIN_QUEUED,
            max_age: DEFAULT_CONSUME_MAX_AGE,
            sync_attempts: DEFAULT_SYNC_ATTEMPTS,
            sync_attempt_timeout: DEFAULT_SYNC_ATTEMPT_TIMEOUT,
        }
    }
}
