//! Background producer that keeps the location queue topped up.
//!
//! The producer runs as a single tokio task. Each iteration plans one step
//! with [`plan_step`], performs at most one lookup, and schedules the next
//! iteration with [`after_fetch`]. A separate interval sweeps stale entries.
//!
//! ```text
//! ┌───────────────────────── run loop (biased select) ──────────────────────┐
//! │  shutdown.cancelled()  → stop                                           │
//! │  cleanup.tick()        → purge entries older than max_queued_age        │
//! │  next step timer       → step() → returns delay → timer reset           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::PrefetchConfig;
use super::queue::LocationQueue;
use super::state::{after_fetch, plan_step, FetchOutcome, ProducerState, StepInput, StepPlan};
use crate::location::LocationSource;
use crate::lookup::{AsyncHttpClient, LookupError};

/// Minimum sweep period; `tokio::time::interval` rejects zero.
const MIN_CLEANUP_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Default)]
struct Runtime {
    state: ProducerState,
    paused_until: Option<Instant>,
    consecutive_errors: u32,
}

/// Point-in-time view of the producer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProducerStatus {
    pub running: bool,
    pub state: ProducerState,
    pub queue_len: usize,
    pub capacity: usize,
    pub consecutive_errors: u32,
    /// Locations pushed onto the queue.
    pub produced: u64,
    /// Failed lookups.
    pub failed: u64,
    /// Resolved locations discarded because the queue filled meanwhile.
    pub dropped: u64,
    /// Entries removed by the stale sweep.
    pub swept: u64,
}

/// Fills a [`LocationQueue`] from a [`LocationSource`].
pub struct PrefetchProducer<C: AsyncHttpClient> {
    source: Arc<LocationSource<C>>,
    queue: Arc<LocationQueue>,
    config: PrefetchConfig,
    runtime: Mutex<Runtime>,
    running: AtomicBool,
    produced: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    swept: AtomicU64,
}

impl<C: AsyncHttpClient> PrefetchProducer<C> {
    pub fn new(
        source: Arc<LocationSource<C>>,
        queue: Arc<LocationQueue>,
        config: PrefetchConfig,
    ) -> Self {
        Self {
            source,
            queue,
            config,
            runtime: Mutex::new(Runtime::default()),
            running: AtomicBool::new(false),
            produced: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            swept: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    pub fn queue(&self) -> &Arc<LocationQueue> {
        &self.queue
    }

    /// Runs until `shutdown` is cancelled. Never exits on lookup errors.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) {
        self.running.store(true, Ordering::SeqCst);
        info!(
            capacity = self.config.capacity,
            base_delay_ms = self.config.base_delay.as_millis() as u64,
            "Prefetch producer started"
        );

        let period = self.config.cleanup_interval.max(MIN_CLEANUP_INTERVAL);
        let mut cleanup = tokio::time::interval(period);
        cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);
        cleanup.tick().await;

        let next = tokio::time::sleep(Duration::ZERO);
        tokio::pin!(next);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                _ = cleanup.tick() => {
                    self.sweep();
                }

                _ = &mut next => {
                    let delay = tokio::select! {
                        biased;
                        _ = shutdown.cancelled() => None,
                        delay = self.step() => Some(delay),
                    };
                    let Some(delay) = delay else { break };
                    next.as_mut().reset(Instant::now() + delay);
                }
            }
        }

        self.running.store(false, Ordering::SeqCst);
        info!(produced = self.produced.load(Ordering::Relaxed), "Prefetch producer stopped");
    }

    /// Performs one producer step and returns the delay until the next one.
    pub async fn step(&self) -> Duration {
        let flight = self.source.try_begin();
        let input = StepInput {
            queue_len: self.queue.len(),
            now: Instant::now(),
            paused_until: self.runtime.lock().paused_until,
            busy: flight.is_none(),
        };

        match plan_step(&self.config, input) {
            StepPlan::StillPaused { recheck } => {
                self.runtime.lock().state = ProducerState::Paused;
                return recheck;
            }
            StepPlan::EnterPause { until, recheck } => {
                let mut rt = self.runtime.lock();
                rt.state = ProducerState::Paused;
                rt.paused_until = Some(until);
                info!(
                    queue_len = input.queue_len,
                    pause_secs = self.config.pause_duration.as_secs(),
                    "Prefetch queue full, pausing producer"
                );
                return recheck;
            }
            StepPlan::Busy { retry } => {
                debug!("Lookup already in flight, producer step deferred");
                return retry;
            }
            StepPlan::Fetch => {}
        }

        let Some(flight) = flight else {
            return self.config.busy_retry;
        };

        let errors_before = {
            let mut rt = self.runtime.lock();
            rt.state = ProducerState::Fetching;
            rt.paused_until = None;
            rt.consecutive_errors
        };

        let outcome = match self.source.resolve_random(&flight).await {
            Ok(location) => match self.queue.push(location) {
                Ok(()) => {
                    self.produced.fetch_add(1, Ordering::Relaxed);
                    FetchOutcome::Queued
                }
                Err(location) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(name = %location.name, "Queue filled during lookup, location dropped");
                    FetchOutcome::Dropped
                }
            },
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                if matches!(e, LookupError::NotFound { .. }) {
                    debug!(error = %e, "Prefetch found no landmark");
                } else {
                    warn!(error = %e, "Prefetch lookup failed");
                }
                FetchOutcome::Failed
            }
        };
        drop(flight);

        let transition = after_fetch(&self.config, outcome, errors_before, self.queue.len());
        {
            let mut rt = self.runtime.lock();
            rt.state = transition.state;
            rt.consecutive_errors = transition.consecutive_errors;
        }
        debug!(
            outcome = ?outcome,
            queue_len = self.queue.len(),
            next_ms = transition.delay.as_millis() as u64,
            "Prefetch step complete"
        );
        transition.delay
    }

    /// Removes queued entries older than the configured age.
    pub fn sweep(&self) -> usize {
        let now = self.source.clock().now();
        let removed = self.queue.purge_older_than(self.config.max_queued_age, now);
        if removed > 0 {
            self.swept.fetch_add(removed as u64, Ordering::Relaxed);
            info!(removed, remaining = self.queue.len(), "Swept stale prefetched locations");
        }
        removed
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> ProducerStatus {
        let rt = self.runtime.lock();
        ProducerStatus {
            running: self.is_running(),
            state: rt.state,
            queue_len: self.queue.len(),
            capacity: self.queue.capacity(),
            consecutive_errors: rt.consecutive_errors,
            produced: self.produced.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::coord::Coordinate;
    use crate::location::{test_source, JitterConfig, ResolvedLocation};
    use crate::lookup::{HttpResponse, MockAsyncHttpClient};
    use chrono::Duration as ChronoDuration;

    const BODY: &[u8] = br#"{"elements":[{"center":{"lat":48.0,"lon":2.0}}]}"#;

    fn ok_client() -> MockAsyncHttpClient {
        MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec())))
    }

    fn failing_client() -> MockAsyncHttpClient {
        MockAsyncHttpClient::always(Ok(HttpResponse::status(503)))
    }

    fn producer(
        client: MockAsyncHttpClient,
        capacity: usize,
        clock: ManualClock,
    ) -> PrefetchProducer<MockAsyncHttpClient> {
        let source = Arc::new(test_source(client, JitterConfig::disabled(), clock));
        let config = PrefetchConfig {
            capacity,
            ..PrefetchConfig::default()
        };
        PrefetchProducer::new(source, Arc::new(LocationQueue::new(capacity)), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_queues_location() {
        let p = producer(ok_client(), 10, ManualClock::starting_now());

        let delay = p.step().await;
        assert_eq!(p.queue().len(), 1);
        assert_eq!(delay, p.config().adaptive_delay(1));

        let status = p.status();
        assert_eq!(status.produced, 1);
        assert_eq!(status.state, ProducerState::Idle);
        assert_eq!(status.consecutive_errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_queue_pauses_for_window() {
        let p = producer(ok_client(), 2, ManualClock::starting_now());
        p.step().await;
        p.step().await;
        assert_eq!(p.queue().len(), 2);

        assert_eq!(p.step().await, Duration::from_secs(5));
        assert_eq!(p.status().state, ProducerState::Paused);

        // Room frees up, but the pause window still holds
        p.queue().pop_front();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(p.step().await, Duration::from_secs(5));
        assert_eq!(p.queue().len(), 1);
        assert_eq!(p.status().produced, 2);

        tokio::time::advance(Duration::from_secs(21)).await;
        p.step().await;
        assert_eq!(p.queue().len(), 2);
        assert_eq!(p.status().produced, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_back_off_exponentially() {
        let p = producer(failing_client(), 10, ManualClock::starting_now());

        let delays: Vec<u128> = {
            let mut v = Vec::new();
            for _ in 0..7 {
                v.push(p.step().await.as_millis());
            }
            v
        };
        assert_eq!(delays, vec![500, 750, 1125, 1687, 2531, 10_000, 10_000]);

        let status = p.status();
        assert_eq!(status.consecutive_errors, 7);
        assert_eq!(status.failed, 7);
        assert_eq!(status.state, ProducerState::Backoff);
        assert!(p.queue().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_busy_slot_defers_without_request() {
        let p = producer(ok_client(), 10, ManualClock::starting_now());
        let held = p.source.try_begin().unwrap();

        assert_eq!(p.step().await, Duration::from_millis(250));
        assert!(p.queue().is_empty());
        drop(held);

        p.step().await;
        assert_eq!(p.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_removes_stale_entries() {
        let clock = ManualClock::starting_now();
        let p = producer(ok_client(), 10, clock.clone());
        let now = clock.now();
        p.queue()
            .push(ResolvedLocation::new(
                Coordinate::new(1.0, 1.0),
                None,
                now - ChronoDuration::minutes(40),
            ))
            .unwrap();
        p.queue()
            .push(ResolvedLocation::new(Coordinate::new(2.0, 2.0), None, now))
            .unwrap();

        assert_eq!(p.sweep(), 1);
        assert_eq!(p.queue().len(), 1);

        clock.advance(Duration::from_secs(31 * 60));
        assert_eq!(p.sweep(), 1);
        assert!(p.queue().is_empty());
        assert_eq!(p.status().swept, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_fills_queue_and_stops_on_cancel() {
        let p = Arc::new(producer(ok_client(), 5, ManualClock::starting_now()));
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&p).run(shutdown.clone()));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(p.is_running());
        assert_eq!(p.queue().len(), 5);
        assert_eq!(p.status().state, ProducerState::Paused);

        shutdown.cancel();
        handle.await.unwrap();
        assert!(!p.is_running());
    }
}
