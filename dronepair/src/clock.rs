//! Injectable time and randomness sources.
//!
//! Services never read the wall clock or a thread-local RNG directly. They
//! take a [`Clock`] and a [`SharedRng`] at construction so tests can drive
//! timestamps and random draws deterministically.

use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Returns the current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
///
/// Useful for exercising age-based eviction without waiting on real time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Create a clock frozen at the current system time.
    pub fn starting_now() -> Self {
        Self::new(Utc::now())
    }

    /// Move the clock forward.
    pub fn advance(&self, by: std::time::Duration) {
        let delta =
            ChronoDuration::from_std(by).unwrap_or_else(|_| ChronoDuration::days(36_500));
        let mut now = self.now.lock();
        *now += delta;
    }

    /// Jump the clock to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.lock() = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Random number generator shared between the producer and consumer paths.
///
/// Cloning shares the underlying generator.
#[derive(Debug, Clone)]
pub struct SharedRng {
    inner: Arc<Mutex<StdRng>>,
}

impl SharedRng {
    /// Seed from the operating system's entropy source.
    pub fn from_entropy() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Deterministic generator for reproducible runs and tests.
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rng)),
        }
    }

    /// Run `f` with exclusive access to the generator.
    ///
    /// The lock is held only for the duration of `f`; never await inside it.
    pub fn with<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.inner.lock();
        f(&mut rng)
    }
}

impl Default for SharedRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Age of `timestamp` relative to `now`, clamped at zero for future stamps.
pub fn age_of(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> std::time::Duration {
    (now - timestamp).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::time::Duration;

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::starting_now();
        let start = clock.now();
        clock.advance(Duration::from_secs(90));
        assert_eq!(age_of(start, clock.now()), Duration::from_secs(90));
    }

    #[test]
    fn test_manual_clock_clones_share_time() {
        let clock = ManualClock::starting_now();
        let other = clock.clone();
        let start = clock.now();
        other.advance(Duration::from_secs(5));
        assert_eq!(clock.now(), start + ChronoDuration::seconds(5));
    }

    #[test]
    fn test_age_of_future_timestamp_is_zero() {
        let now = Utc::now();
        let future = now + ChronoDuration::seconds(10);
        assert_eq!(age_of(future, now), Duration::ZERO);
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let a = SharedRng::seeded(42);
        let b = SharedRng::seeded(42);
        let xs: Vec<u32> = (0..8).map(|_| a.with(|r| r.random())).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.with(|r| r.random())).collect();
        assert_eq!(xs, ys);
    }
}
