//! Location generation with a prefetching producer behind it.
//!
//! # Consumption
//!
//! ```text
//! generate_random_location()
//!   ├─ ensure producer task is running (once)
//!   ├─ queue non-empty ─► head, or a random entry (20 %, only when > 10 queued)
//!   │                      └─ older than 2 h? discard ──┐
//!   └─ queue empty ─► warn ─────────────────────────────┤
//!                                                       ▼
//!                     synchronous: up to 5 × (new random point, 5 s deadline)
//!                                  └─ all failed ─► GenerationError::Exhausted
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::consumer::ConsumerConfig;
use super::error::GenerationError;
use crate::location::{LocationSource, ResolvedLocation};
use crate::lookup::AsyncHttpClient;
use crate::prefetch::{LocationQueue, PrefetchConfig, PrefetchProducer, ProducerStatus};

/// Owns the location queue, its producer task and the consumer policy.
pub struct LocationService<C: AsyncHttpClient + 'static> {
    source: Arc<LocationSource<C>>,
    queue: Arc<LocationQueue>,
    producer: Arc<PrefetchProducer<C>>,
    consumer: ConsumerConfig,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<C: AsyncHttpClient + 'static> LocationService<C> {
    /// Creates a service. The producer does not start until the first
    /// [`generate_random_location`](Self::generate_random_location) or
    /// [`ensure_prefetching`](Self::ensure_prefetching) call.
    pub fn new(
        source: LocationSource<C>,
        prefetch: PrefetchConfig,
        consumer: ConsumerConfig,
    ) -> Self {
        let source = Arc::new(source);
        let queue = Arc::new(LocationQueue::new(prefetch.capacity));
        let producer = Arc::new(PrefetchProducer::new(
            Arc::clone(&source),
            Arc::clone(&queue),
            prefetch,
        ));

        Self {
            source,
            queue,
            producer,
            consumer,
            shutdown: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn source(&self) -> &Arc<LocationSource<C>> {
        &self.source
    }

    pub fn queue(&self) -> &Arc<LocationQueue> {
        &self.queue
    }

    pub fn consumer_config(&self) -> &ConsumerConfig {
        &self.consumer
    }

    /// Starts the producer task unless it is already running.
    ///
    /// Returns `true` when this call started it. Must be called from within
    /// a tokio runtime. Does nothing after [`shutdown`](Self::shutdown).
    pub fn ensure_prefetching(&self) -> bool {
        if self.shutdown.is_cancelled() {
            return false;
        }

        let mut task = self.task.lock();
        if task.as_ref().is_some_and(|h| !h.is_finished()) {
            return false;
        }

        let producer = Arc::clone(&self.producer);
        *task = Some(tokio::spawn(producer.run(self.shutdown.child_token())));
        debug!("Prefetch producer task spawned");
        true
    }

    /// Returns one location, from the queue when possible.
    ///
    /// # Errors
    ///
    /// [`GenerationError::Exhausted`] when the queue could not serve and
    /// every synchronous attempt failed.
    pub async fn generate_random_location(&self) -> Result<ResolvedLocation, GenerationError> {
        self.ensure_prefetching();

        match self.try_take_queued() {
            Ok(location) => return Ok(location),
            Err(GenerationError::QueueEmpty) => {
                warn!(
                    capacity = self.queue.capacity(),
                    "Prefetch queue empty, resolving synchronously"
                );
            }
            Err(GenerationError::Stale { age }) => {
                info!(age_secs = age.as_secs(), "Discarded stale queued location");
            }
            Err(e) => return Err(e),
        }

        self.resolve_now().await
    }

    /// Takes a queued location without any fallback.
    ///
    /// # Errors
    ///
    /// * [`GenerationError::QueueEmpty`] - nothing queued
    /// * [`GenerationError::Stale`] - the taken entry was too old and has
    ///   been discarded
    pub fn try_take_queued(&self) -> Result<ResolvedLocation, GenerationError> {
        let consumer = &self.consumer;
        let location = self
            .queue
            .take_with(|len| {
                self.source.rng().with(|rng| {
                    if len > consumer.random_pick_min_queued
                        && rng.random_bool(consumer.random_pick_probability.clamp(0.0, 1.0))
                    {
                        rng.random_range(0..len)
                    } else {
                        0
                    }
                })
            })
            .ok_or(GenerationError::QueueEmpty)?;

        let age = location.age(self.source.clock().now());
        if age > consumer.max_age {
            return Err(GenerationError::Stale { age });
        }
        Ok(location)
    }

    /// Resolves a location right now, bypassing the queue.
    ///
    /// Each attempt draws a fresh random point and waits for the shared
    /// single-flight slot and the lookup within one deadline.
    pub async fn resolve_now(&self) -> Result<ResolvedLocation, GenerationError> {
        let attempts = self.consumer.sync_attempts.max(1);

        for attempt in 1..=attempts {
            let result = tokio::time::timeout(self.consumer.sync_attempt_timeout, async {
                let flight = self.source.begin().await;
                self.source.resolve_random(&flight).await
            })
            .await;

            match result {
                Ok(Ok(location)) => {
                    debug!(attempt, name = %location.name, "Synchronous resolution succeeded");
                    return Ok(location);
                }
                Ok(Err(e)) => {
                    warn!(attempt, attempts, error = %e, "Synchronous resolution failed");
                }
                Err(_) => {
                    warn!(
                        attempt,
                        attempts,
                        timeout_secs = self.consumer.sync_attempt_timeout.as_secs(),
                        "Synchronous resolution timed out"
                    );
                }
            }
        }

        Err(GenerationError::Exhausted { attempts })
    }

    /// Snapshot of the producer.
    pub fn status(&self) -> ProducerStatus {
        self.producer.status()
    }

    /// Stops the producer and waits for its task to finish.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let handle = self.task.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Prefetch producer task ended abnormally");
            }
        }
        info!("Location service stopped");
    }
}

impl<C: AsyncHttpClient + 'static> Drop for LocationService<C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use crate::coord::Coordinate;
    use crate::location::{test_source, JitterConfig};
    use crate::lookup::{HttpResponse, MockAsyncHttpClient};
    use chrono::Duration as ChronoDuration;
    use std::collections::HashSet;
    use std::time::Duration;

    const BODY: &[u8] = br#"{"elements":[{"center":{"lat":48.0,"lon":2.0}}]}"#;

    fn service_with(
        client: MockAsyncHttpClient,
        clock: ManualClock,
    ) -> LocationService<MockAsyncHttpClient> {
        let source = test_source(client, JitterConfig::disabled(), clock);
        LocationService::new(source, PrefetchConfig::default(), ConsumerConfig::default())
    }

    fn queued(lat: f64, clock: &ManualClock) -> ResolvedLocation {
        ResolvedLocation::new(Coordinate::new(lat, 0.0), None, clock.now())
    }

    #[tokio::test]
    async fn test_takes_head_with_few_entries() {
        let clock = ManualClock::starting_now();
        let service = service_with(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec()))),
            clock.clone(),
        );
        for i in 0..10 {
            service.queue().push(queued(i as f64, &clock)).unwrap();
        }
        for i in 0..10 {
            let loc = service.try_take_queued().unwrap();
            assert_eq!(loc.coordinate.lat, i as f64);
        }
        assert_eq!(service.try_take_queued(), Err(GenerationError::QueueEmpty));
    }

    #[tokio::test]
    async fn test_random_pick_with_many_entries() {
        let clock = ManualClock::starting_now();
        let service = service_with(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec()))),
            clock.clone(),
        );
        let mut out_of_order = 0;
        for _ in 0..200 {
            service.queue().clear();
            for i in 0..50 {
                service.queue().push(queued(i as f64, &clock)).unwrap();
            }
            if service.try_take_queued().unwrap().coordinate.lat != 0.0 {
                out_of_order += 1;
            }
        }
        assert!((15..=70).contains(&out_of_order), "out of order {}", out_of_order);
    }

    #[tokio::test]
    async fn test_stale_entry_discarded() {
        let clock = ManualClock::starting_now();
        let service = service_with(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec()))),
            clock.clone(),
        );
        let old = ResolvedLocation::new(
            Coordinate::new(1.0, 1.0),
            None,
            clock.now() - ChronoDuration::hours(3),
        );
        service.queue().push(old).unwrap();

        assert!(matches!(
            service.try_take_queued(),
            Err(GenerationError::Stale { .. })
        ));
        assert!(service.queue().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_falls_back_to_lookup() {
        let clock = ManualClock::starting_now();
        let service = service_with(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec()))),
            clock.clone(),
        );
        let old = ResolvedLocation::new(
            Coordinate::new(1.0, 1.0),
            None,
            clock.now() - ChronoDuration::hours(3),
        );
        service.queue().push(old).unwrap();

        let loc = service.generate_random_location().await.unwrap();
        assert_eq!(loc.coordinate, Coordinate::new(48.0, 2.0));
        service.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_queue_resolves_synchronously() {
        let service = service_with(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec()))),
            ManualClock::starting_now(),
        );
        let loc = service.generate_random_location().await.unwrap();
        assert_eq!(loc.name, "48.000000,2.000000");
        assert!(service.task.lock().is_some());
        service.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_after_five_failures() {
        let service = service_with(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(br#"{"elements":[]}"#.to_vec()))),
            ManualClock::starting_now(),
        );
        let err = service.resolve_now().await.unwrap_err();
        assert_eq!(err, GenerationError::Exhausted { attempts: 5 });
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_attempt_times_out() {
        let client = MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec())))
            .with_delay(Duration::from_secs(8));
        let service = service_with(client, ManualClock::starting_now());

        let started = tokio::time::Instant::now();
        let err = service.resolve_now().await.unwrap_err();
        assert_eq!(err, GenerationError::Exhausted { attempts: 5 });
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(25) && elapsed < Duration::from_secs(26));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_out_attempt_marks_endpoint_failed() {
        let client = MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec())))
            .with_delay(Duration::from_secs(8));
        let service = service_with(client, ManualClock::starting_now());

        assert!(service.resolve_now().await.is_err());

        let records = service.source().resolver().router().snapshot();
        assert_eq!(records.len(), 1);
        // Three timeouts demote, the reset re-admits, two more count again
        assert_eq!(records[0].consecutive_failures, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_waits_for_in_flight_slot() {
        let service = service_with(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec()))),
            ManualClock::starting_now(),
        );
        let held = service.source().try_begin().unwrap();
        let result = service.resolve_now().await;
        assert_eq!(result, Err(GenerationError::Exhausted { attempts: 5 }));
        drop(held);

        assert!(service.resolve_now().await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_producer_started_once() {
        let service = service_with(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec()))),
            ManualClock::starting_now(),
        );
        assert!(service.ensure_prefetching());
        assert!(!service.ensure_prefetching());

        tokio::time::sleep(Duration::from_secs(30)).await;
        let seen: HashSet<String> = service
            .queue()
            .snapshot()
            .into_iter()
            .map(|l| l.name)
            .collect();
        assert!(!seen.is_empty());

        service.shutdown().await;
        assert!(!service.status().running);
        assert!(!service.ensure_prefetching());
    }
}
