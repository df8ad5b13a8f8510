//! Bounded in-memory cache of resolved landmark locations.
//!
//! Entries are keyed by the query coordinate rounded to one decimal place
//! (~1 km), so nearby lookups share a line. When an insert pushes the cache
//! over its limit, a single pass drops the least recently accessed 20% of
//! entries instead of evicting one entry per insert.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::coord::Coordinate;

/// Default maximum number of cached locations.
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Fraction of entries removed by one eviction pass.
pub const EVICTION_FRACTION: f64 = 0.2;

/// Cache key: latitude and longitude in tenths of a degree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lat_tenths: i32,
    lon_tenths: i32,
}

impl CacheKey {
    /// Rounds `coord` to one decimal place.
    pub fn from_coordinate(coord: &Coordinate) -> Self {
        Self {
            lat_tenths: (coord.lat * 10.0).round() as i32,
            lon_tenths: (coord.lon * 10.0).round() as i32,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.1},{:.1}",
            self.lat_tenths as f64 / 10.0,
            self.lon_tenths as f64 / 10.0
        )
    }
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocationCacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evicted_entries: u64,
    pub eviction_passes: u64,
    pub entries: usize,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Coordinate,
    last_access: DateTime<Utc>,
    /// Tie-breaker when several entries share a timestamp.
    sequence: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    next_sequence: u64,
}

impl Inner {
    fn tick(&mut self) -> u64 {
        self.next_sequence += 1;
        self.next_sequence
    }
}

/// Coordinate-keyed cache with batched LRU eviction.
pub struct LocationCache {
    inner: Mutex<Inner>,
    max_entries: usize,
    clock: Arc<dyn Clock>,
    hits: AtomicU64,
    misses: AtomicU64,
    evicted_entries: AtomicU64,
    eviction_passes: AtomicU64,
}

impl fmt::Debug for LocationCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocationCache")
            .field("max_entries", &self.max_entries)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl LocationCache {
    /// Create a cache holding at most `max_entries` locations.
    pub fn new(max_entries: usize) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    /// Create a cache that timestamps accesses with `clock`.
    pub fn with_clock(max_entries: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
            clock,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evicted_entries: AtomicU64::new(0),
            eviction_passes: AtomicU64::new(0),
        }
    }

    /// Look up a location, refreshing its last-access time on a hit.
    pub fn get(&self, key: &CacheKey) -> Option<Coordinate> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let sequence = inner.tick();

        match inner.entries.get_mut(key) {
            Some(entry) => {
                entry.last_access = now;
                entry.sequence = sequence;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace a location.
    ///
    /// Runs one eviction pass when the insert takes the cache over its limit.
    pub fn put(&self, key: CacheKey, value: Coordinate) {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let sequence = inner.tick();

        inner.entries.insert(
            key,
            CacheEntry {
                value,
                last_access: now,
                sequence,
            },
        );

        if inner.entries.len() > self.max_entries {
            self.evict_locked(&mut inner);
        }
    }

    /// Remove the least recently accessed 20% of entries (at least one).
    ///
    /// Returns the number of entries removed.
    pub fn evict_batch(&self) -> usize {
        let mut inner = self.inner.lock();
        self.evict_locked(&mut inner)
    }

    fn evict_locked(&self, inner: &mut Inner) -> usize {
        let len = inner.entries.len();
        if len == 0 {
            return 0;
        }
        let to_remove = ((len as f64 * EVICTION_FRACTION).floor() as usize).max(1);

        let mut by_age: Vec<(DateTime<Utc>, u64, CacheKey)> = inner
            .entries
            .iter()
            .map(|(key, entry)| (entry.last_access, entry.sequence, *key))
            .collect();
        by_age.sort_unstable_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        for (_, _, key) in by_age.into_iter().take(to_remove) {
            inner.entries.remove(&key);
        }

        self.evicted_entries.fetch_add(to_remove as u64, Ordering::Relaxed);
        self.eviction_passes.fetch_add(1, Ordering::Relaxed);
        debug!(
            removed = to_remove,
            remaining = inner.entries.len(),
            "Location cache eviction pass"
        );
        to_remove
    }

    /// Whether `key` is cached. Does not count as an access.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.lock().entries.contains_key(key)
    }

    /// Number of cached locations.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Configured capacity.
    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Current statistics.
    pub fn stats(&self) -> LocationCacheStats {
        LocationCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evicted_entries: self.evicted_entries.load(Ordering::Relaxed),
            eviction_passes: self.eviction_passes.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Drop all entries.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }
}

impl Default for LocationCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::time::Duration;

    fn key(i: usize) -> CacheKey {
        CacheKey::from_coordinate(&Coordinate::new(i as f64, 0.0))
    }

    fn value(i: usize) -> Coordinate {
        Coordinate::new(i as f64, 0.5)
    }

    #[test]
    fn test_key_rounds_to_one_decimal() {
        let a = CacheKey::from_coordinate(&Coordinate::new(48.04, 2.01));
        let b = CacheKey::from_coordinate(&Coordinate::new(47.96, 1.96));
        let c = CacheKey::from_coordinate(&Coordinate::new(48.06, 2.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "48.0,2.0");
    }

    #[test]
    fn test_get_miss_then_hit() {
        let cache = LocationCache::new(10);
        assert!(cache.get(&key(1)).is_none());
        cache.put(key(1), value(1));
        assert_eq!(cache.get(&key(1)), Some(value(1)));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_put_replaces_existing_value() {
        let cache = LocationCache::new(10);
        cache.put(key(1), value(1));
        cache.put(key(1), value(2));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&key(1)), Some(value(2)));
    }

    #[test]
    fn test_overflow_evicts_twenty_percent() {
        let cache = LocationCache::new(10);
        for i in 0..10 {
            cache.put(key(i), value(i));
        }
        assert_eq!(cache.len(), 10);

        // 11 entries -> floor(11 * 0.2) = 2 removed
        cache.put(key(10), value(10));
        assert_eq!(cache.len(), 9);
        assert!(!cache.contains(&key(0)));
        assert!(!cache.contains(&key(1)));
        assert!(cache.contains(&key(2)));
        assert!(cache.contains(&key(10)));
        assert_eq!(cache.stats().eviction_passes, 1);
    }

    #[test]
    fn test_eviction_removes_at_least_one() {
        let cache = LocationCache::new(2);
        cache.put(key(0), value(0));
        cache.put(key(1), value(1));
        // 3 entries -> floor(0.6) = 0, bumped to 1
        cache.put(key(2), value(2));
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&key(0)));
    }

    #[test]
    fn test_recent_access_protects_entry() {
        let clock = ManualClock::starting_now();
        let cache = LocationCache::with_clock(5, Arc::new(clock.clone()));
        for i in 0..5 {
            cache.put(key(i), value(i));
            clock.advance(Duration::from_secs(1));
        }

        // Touch the oldest entry so it becomes the most recent
        assert!(cache.get(&key(0)).is_some());
        clock.advance(Duration::from_secs(1));

        cache.put(key(5), value(5));
        assert!(cache.contains(&key(0)), "recently read entry must survive");
        assert!(!cache.contains(&key(1)), "least recently used entry goes");
    }

    #[test]
    fn test_evict_batch_on_empty_cache() {
        let cache = LocationCache::new(4);
        assert_eq!(cache.evict_batch(), 0);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_size_never_exceeds_max_after_put(
                max in 1usize..50,
                keys in proptest::collection::vec(0usize..200, 1..300)
            ) {
                let cache = LocationCache::new(max);
                for k in keys {
                    cache.put(key(k), value(k));
                    prop_assert!(cache.len() <= max);
                }
            }
        }
    }
}
