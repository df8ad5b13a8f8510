//! Health- and latency-aware selection among interchangeable endpoints.
//!
//! # Selection
//!
//! ```text
//! healthy = endpoints where healthy
//! healthy empty  --> reset all records, round-robin pick
//! otherwise      --> sort by latency (measured first, unmeasured last),
//!                    pick uniformly among the best min(3, n)
//! ```
//!
//! An endpoint is demoted the moment its consecutive failure count reaches
//! the threshold. Any success resets the count and restores health. When
//! every endpoint is demoted at once, all of them are reset so lookups can
//! never wedge permanently.

use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, warn};

use super::types::LookupError;
use crate::clock::SharedRng;

/// Consecutive failures that demote an endpoint.
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 3;

/// Number of best-ranked endpoints a request is spread across.
pub const SELECTION_POOL_SIZE: usize = 3;

/// Health and latency bookkeeping for one endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRecord {
    pub endpoint: String,
    pub consecutive_failures: u32,
    pub last_latency: Option<Duration>,
    pub healthy: bool,
}

impl EndpointRecord {
    fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            consecutive_failures: 0,
            last_latency: None,
            healthy: true,
        }
    }

    fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.healthy = true;
    }
}

/// Measured latencies first (ascending), unmeasured endpoints after them.
fn by_latency(a: &EndpointRecord, b: &EndpointRecord) -> CmpOrdering {
    match (a.last_latency, b.last_latency) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => CmpOrdering::Less,
        (None, Some(_)) => CmpOrdering::Greater,
        (None, None) => CmpOrdering::Equal,
    }
}

/// Routes lookup requests across failover endpoints.
#[derive(Debug)]
pub struct EndpointRouter {
    records: Mutex<Vec<EndpointRecord>>,
    round_robin: AtomicUsize,
    failure_threshold: u32,
    rng: SharedRng,
}

impl EndpointRouter {
    /// Create a router over `endpoints`.
    ///
    /// Duplicate URLs are collapsed. Fails when no endpoint is given.
    pub fn new(
        endpoints: impl IntoIterator<Item = impl Into<String>>,
        failure_threshold: u32,
        rng: SharedRng,
    ) -> Result<Self, LookupError> {
        let mut records: Vec<EndpointRecord> = Vec::new();
        for endpoint in endpoints {
            let endpoint = endpoint.into();
            if !records.iter().any(|r| r.endpoint == endpoint) {
                records.push(EndpointRecord::new(endpoint));
            }
        }
        if records.is_empty() {
            return Err(LookupError::NoEndpoints);
        }

        Ok(Self {
            records: Mutex::new(records),
            round_robin: AtomicUsize::new(0),
            failure_threshold: failure_threshold.max(1),
            rng,
        })
    }

    /// Choose the endpoint for the next request.
    pub fn select_endpoint(&self) -> String {
        let mut records = self.records.lock();

        if !records.iter().any(|r| r.healthy) {
            warn!(
                endpoints = records.len(),
                "All lookup endpoints unhealthy, resetting health state"
            );
            for record in records.iter_mut() {
                record.reset();
            }
            let index = self.round_robin.fetch_add(1, Ordering::Relaxed) % records.len();
            return records[index].endpoint.clone();
        }

        let candidates: Vec<&EndpointRecord> = records.iter().filter(|r| r.healthy).collect();
        self.pick_ranked(candidates)
    }

    /// Choose an endpoint other than `exclude`, for retrying elsewhere.
    ///
    /// Prefers healthy alternatives, then any alternative. Returns `exclude`
    /// when it is the only endpoint.
    pub fn select_alternate(&self, exclude: &str) -> String {
        let records = self.records.lock();

        let healthy: Vec<&EndpointRecord> = records
            .iter()
            .filter(|r| r.healthy && r.endpoint != exclude)
            .collect();
        if !healthy.is_empty() {
            return self.pick_ranked(healthy);
        }

        let others: Vec<&EndpointRecord> =
            records.iter().filter(|r| r.endpoint != exclude).collect();
        if others.is_empty() {
            return exclude.to_string();
        }
        let index = self.round_robin.fetch_add(1, Ordering::Relaxed) % others.len();
        others[index].endpoint.clone()
    }

    fn pick_ranked(&self, mut candidates: Vec<&EndpointRecord>) -> String {
        candidates.sort_by(|a, b| by_latency(a, b));
        let pool = candidates.len().min(SELECTION_POOL_SIZE);
        let index = self.rng.with(|rng| rng.random_range(0..pool));
        candidates[index].endpoint.clone()
    }

    /// Record a completed request.
    pub fn record_success(&self, endpoint: &str, latency: Duration) {
        let mut records = self.records.lock();
        if let Some(record) = records.iter_mut().find(|r| r.endpoint == endpoint) {
            record.last_latency = Some(latency);
            record.consecutive_failures = 0;
            record.healthy = true;
            debug!(
                endpoint,
                latency_ms = latency.as_millis() as u64,
                "Lookup endpoint succeeded"
            );
        }
    }

    /// Record a failed request, demoting the endpoint at the threshold.
    pub fn record_failure(&self, endpoint: &str) {
        let mut records = self.records.lock();
        if let Some(record) = records.iter_mut().find(|r| r.endpoint == endpoint) {
            record.consecutive_failures = record.consecutive_failures.saturating_add(1);
            if record.healthy && record.consecutive_failures >= self.failure_threshold {
                record.healthy = false;
                warn!(
                    endpoint,
                    failures = record.consecutive_failures,
                    "Lookup endpoint marked unhealthy"
                );
            } else {
                debug!(
                    endpoint,
                    failures = record.consecutive_failures,
                    "Lookup endpoint failed"
                );
            }
        }
    }

    /// Copy of every endpoint's record.
    pub fn snapshot(&self) -> Vec<EndpointRecord> {
        self.records.lock().clone()
    }

    /// Number of endpoints currently considered healthy.
    pub fn healthy_count(&self) -> usize {
        self.records.lock().iter().filter(|r| r.healthy).count()
    }

    /// Number of configured endpoints.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Always false; a router cannot be built without endpoints.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    const A: &str = "https://a.example/api/interpreter";
    const B: &str = "https://b.example/api/interpreter";
    const C: &str = "https://c.example/api/interpreter";
    const D: &str = "https://d.example/api/interpreter";

    fn router(endpoints: &[&str]) -> EndpointRouter {
        EndpointRouter::new(
            endpoints.iter().copied(),
            DEFAULT_FAILURE_THRESHOLD,
            SharedRng::seeded(3),
        )
        .unwrap()
    }

    fn record(router: &EndpointRouter, endpoint: &str) -> EndpointRecord {
        router
            .snapshot()
            .into_iter()
            .find(|r| r.endpoint == endpoint)
            .unwrap()
    }

    #[test]
    fn test_empty_router_rejected() {
        let result = EndpointRouter::new(Vec::<String>::new(), 3, SharedRng::seeded(0));
        assert!(matches!(result, Err(LookupError::NoEndpoints)));
    }

    #[test]
    fn test_duplicates_collapsed() {
        let r = router(&[A, A, B]);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn test_demoted_exactly_at_threshold() {
        let r = router(&[A, B]);
        r.record_failure(A);
        r.record_failure(A);
        assert!(record(&r, A).healthy);
        r.record_failure(A);
        let rec = record(&r, A);
        assert!(!rec.healthy);
        assert_eq!(rec.consecutive_failures, 3);
    }

    #[test]
    fn test_success_resets_failure_count() {
        let r = router(&[A, B]);
        r.record_failure(A);
        r.record_failure(A);
        r.record_success(A, Duration::from_millis(120));
        assert_eq!(record(&r, A).consecutive_failures, 0);

        r.record_failure(A);
        r.record_failure(A);
        assert!(record(&r, A).healthy, "count restarted after success");
    }

    #[test]
    fn test_unhealthy_endpoint_never_selected() {
        let r = router(&[A, B]);
        for _ in 0..3 {
            r.record_failure(A);
        }
        for _ in 0..50 {
            assert_eq!(r.select_endpoint(), B);
        }
    }

    #[test]
    fn test_all_unhealthy_resets_and_still_selects() {
        let r = router(&[A, B]);
        for _ in 0..3 {
            r.record_failure(A);
            r.record_failure(B);
        }
        assert_eq!(r.healthy_count(), 0);

        let chosen = r.select_endpoint();
        assert!(chosen == A || chosen == B);
        assert_eq!(r.healthy_count(), 2);
        assert!(r.snapshot().iter().all(|rec| rec.consecutive_failures == 0));
    }

    #[test]
    fn test_selection_spread_over_three_fastest() {
        let r = router(&[A, B, C, D]);
        r.record_success(A, Duration::from_millis(10));
        r.record_success(B, Duration::from_millis(20));
        r.record_success(C, Duration::from_millis(30));
        r.record_success(D, Duration::from_millis(900));

        let mut seen = HashSet::new();
        for _ in 0..200 {
            seen.insert(r.select_endpoint());
        }
        assert!(!seen.contains(D), "slowest endpoint outside the pool");
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_measured_preferred_over_unmeasured() {
        let r = router(&[A, B, C, D]);
        r.record_success(B, Duration::from_millis(400));
        r.record_success(C, Duration::from_millis(300));
        r.record_success(D, Duration::from_millis(500));

        for _ in 0..100 {
            assert_ne!(r.select_endpoint(), A);
        }
    }

    #[test]
    fn test_unmeasured_used_when_nothing_measured() {
        let r = router(&[A, B]);
        let mut seen = HashSet::new();
        for _ in 0..100 {
            seen.insert(r.select_endpoint());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn test_alternate_differs_from_excluded() {
        let r = router(&[A, B, C]);
        for _ in 0..50 {
            assert_ne!(r.select_alternate(A), A);
        }
    }

    #[test]
    fn test_alternate_falls_back_to_unhealthy_other() {
        let r = router(&[A, B]);
        for _ in 0..3 {
            r.record_failure(B);
        }
        assert_eq!(r.select_alternate(A), B);
    }

    #[test]
    fn test_alternate_with_single_endpoint() {
        let r = router(&[A]);
        assert_eq!(r.select_alternate(A), A);
    }

    #[test]
    fn test_unknown_endpoint_ignored() {
        let r = router(&[A]);
        r.record_failure("https://unknown.example");
        r.record_success("https://unknown.example", Duration::from_millis(1));
        assert_eq!(r.snapshot(), vec![EndpointRecord::new(A.to_string())]);
    }
}
