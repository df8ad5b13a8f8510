//! Prefetch tuning: capacity, pacing, backoff and freshness.
//!
//! # Pacing
//!
//! ```text
//! fill = queue_len / capacity
//! adaptive delay = base × (1 + 1.33 × fill) × (3 if fill > 0.8 else 1)
//!
//!   fill 0.0  →  1.0 × base
//!   fill 0.8  →  2.06 × base
//!   fill 1.0  →  6.99 × base      (~7× at full occupancy)
//! ```
//!
//! # Backoff
//!
//! ```text
//! n consecutive errors (n ≥ 1)
//!   n ≤ 5  →  500 ms × 1.5^(n-1)     500, 750, 1125, 1687, 2531 ms
//!   n > 5  →  10 s
//!   never above 30 s
//! ```

use std::time::Duration;

// =============================================================================
// Queue Constants
// =============================================================================

/// Default maximum number of queued locations.
pub const DEFAULT_QUEUE_CAPACITY: usize = 300;

/// Default interval between stale-entry sweeps (5 minutes).
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default age after which the sweep drops a queued entry (30 minutes).
pub const DEFAULT_MAX_QUEUED_AGE: Duration = Duration::from_secs(30 * 60);

// =============================================================================
// Pacing Constants
// =============================================================================

/// Default delay between successful fetches at an empty queue.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(2);

/// Gain applied to queue occupancy in the adaptive delay.
pub const OCCUPANCY_GAIN: f64 = 1.33;

/// Occupancy fraction above which the slowdown multiplier applies.
pub const SLOWDOWN_THRESHOLD: f64 = 0.8;

/// Extra multiplier applied above [`SLOWDOWN_THRESHOLD`].
pub const SLOWDOWN_FACTOR: f64 = 3.0;

/// How long the producer stays paused once the queue is full.
pub const DEFAULT_PAUSE_DURATION: Duration = Duration::from_secs(30);

/// Recheck interval while paused.
pub const DEFAULT_PAUSE_RECHECK: Duration = Duration::from_secs(5);

/// Retry interval when another lookup holds the single-flight slot.
pub const DEFAULT_BUSY_RETRY: Duration = Duration::from_millis(250);

// =============================================================================
// Backoff Constants
// =============================================================================

/// First backoff delay after a failure.
pub const DEFAULT_BACKOFF_INITIAL: Duration = Duration::from_millis(500);

/// Growth per additional consecutive failure.
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 1.5;

/// Consecutive failures after which the plateau delay is used.
pub const DEFAULT_BACKOFF_PLATEAU_AFTER: u32 = 5;

/// Delay used once the failure streak exceeds the plateau threshold.
pub const DEFAULT_BACKOFF_PLATEAU: Duration = Duration::from_secs(10);

/// Upper bound on any backoff delay.
pub const DEFAULT_BACKOFF_CEILING: Duration = Duration::from_secs(30);

/// Exponential backoff for consecutive producer failures.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub multiplier: f64,
    pub plateau_after: u32,
    pub plateau: Duration,
    pub ceiling: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: DEFAULT_BACKOFF_INITIAL,
            multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            plateau_after: DEFAULT_BACKOFF_PLATEAU_AFTER,
            plateau: DEFAULT_BACKOFF_PLATEAU,
            ceiling: DEFAULT_BACKOFF_CEILING,
        }
    }
}

impl BackoffPolicy {
    /// Delay before the next attempt after `consecutive_errors` failures.
    ///
    /// # Arguments
    ///
    /// * `consecutive_errors` - Failure streak including the latest one.
    ///   Zero is treated as one.
    pub fn delay_for(&self, consecutive_errors: u32) -> Duration {
        let n = consecutive_errors.max(1);
        let delay = if n > self.plateau_after {
            self.plateau
        } else {
            let factor = self.multiplier.powi((n - 1) as i32);
            Duration::from_secs_f64(self.initial.as_secs_f64() * factor)
        };
        delay.min(self.ceiling)
    }
}

/// Configuration for the prefetch producer and its queue.
#[derive(Debug, Clone, PartialEq)]
pub struct PrefetchConfig {
    /// Maximum queued locations.
    pub capacity: usize,
    /// Delay between fetches at an empty queue.
    pub base_delay: Duration,
    /// Pause length once the queue is full.
    pub pause_duration: Duration,
    /// Recheck interval while paused.
    pub pause_recheck: Duration,
    /// Retry interval while the single-flight slot is taken.
    pub busy_retry: Duration,
    /// Failure backoff.
    pub backoff: BackoffPolicy,
    /// Interval between stale-entry sweeps.
    pub cleanup_interval: Duration,
    /// Age beyond which the sweep drops an entry.
    pub max_queued_age: Duration,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
            base_delay: DEFAULT_BASE_DELAY,
            pause_duration: DEFAULT_PAUSE_DURATION,
            pause_recheck: DEFAULT_PAUSE_RECHECK,
            busy_retry: DEFAULT_BUSY_RETRY,
            backoff: BackoffPolicy::default(),
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
            max_queued_age: DEFAULT_MAX_QUEUED_AGE,
        }
    }
}

impl PrefetchConfig {
    /// Queue occupancy in [0, 1].
    pub fn fill_ratio(&self, queue_len: usize) -> f64 {
        if self.capacity == 0 {
            return 1.0;
        }
        (queue_len as f64 / self.capacity as f64).clamp(0.0, 1.0)
    }

    /// Delay before the next fetch after a success.
    pub fn adaptive_delay(&self, queue_len: usize) -> Duration {
        let fill = self.fill_ratio(queue_len);
        let mut factor = 1.0 + OCCUPANCY_GAIN * fill;
        if fill > SLOWDOWN_THRESHOLD {
            factor *= SLOWDOWN_FACTOR;
        }
        Duration::from_secs_f64(self.base_delay.as_secs_f64() * factor)
    }
}
