//! Random landmark source shared by the prefetch producer and the consumer.
//!
//! ```text
//! RegionSampler ──► LandmarkResolver ──► JitterConfig::apply ──► ResolvedLocation
//!   (random region,     (cache, throttle,      (50 %, ≤ 200 m)        (timestamped)
//!    random point)       router, deadline)
//! ```
//!
//! Both callers must hold the single-flight guard while resolving so that
//! at most one external request is outstanding across the whole service.

use std::sync::Arc;

use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tracing::debug;

use super::types::{JitterConfig, ResolvedLocation};
use crate::clock::{Clock, SharedRng};
use crate::coord::RegionSampler;
use crate::lookup::{AsyncHttpClient, LandmarkResolver, LookupError};

/// Guard proving the holder owns the single in-flight lookup slot.
pub type FlightGuard<'a> = AsyncMutexGuard<'a, ()>;

/// Produces timestamped, optionally jittered landmark locations.
pub struct LocationSource<C: AsyncHttpClient> {
    sampler: RegionSampler,
    resolver: LandmarkResolver<C>,
    jitter: JitterConfig,
    rng: SharedRng,
    clock: Arc<dyn Clock>,
    in_flight: AsyncMutex<()>,
}

impl<C: AsyncHttpClient> LocationSource<C> {
    /// Creates a source drawing from `sampler` and resolving with `resolver`.
    pub fn new(
        sampler: RegionSampler,
        resolver: LandmarkResolver<C>,
        jitter: JitterConfig,
        rng: SharedRng,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sampler,
            resolver,
            jitter,
            rng,
            clock,
            in_flight: AsyncMutex::new(()),
        }
    }

    /// The underlying resolver.
    pub fn resolver(&self) -> &LandmarkResolver<C> {
        &self.resolver
    }

    /// The region sampler.
    pub fn sampler(&self) -> &RegionSampler {
        &self.sampler
    }

    /// The shared random source.
    pub fn rng(&self) -> &SharedRng {
        &self.rng
    }

    /// The injected clock.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Takes the single-flight slot if nobody else holds it.
    pub fn try_begin(&self) -> Option<FlightGuard<'_>> {
        self.in_flight.try_lock().ok()
    }

    /// Waits for the single-flight slot.
    pub async fn begin(&self) -> FlightGuard<'_> {
        self.in_flight.lock().await
    }

    /// Whether a lookup is currently outstanding.
    pub fn is_busy(&self) -> bool {
        self.in_flight.try_lock().is_err()
    }

    /// Samples a random coordinate and resolves it to a landmark.
    ///
    /// The caller must hold a [`FlightGuard`] for the duration of the call.
    pub async fn resolve_random(
        &self,
        _flight: &FlightGuard<'_>,
    ) -> Result<ResolvedLocation, LookupError> {
        let (region, query) = self.rng.with(|rng| {
            let (region, coord) = self.sampler.sample(rng);
            (region.name.clone(), coord)
        });
        debug!(region = %region, query = %query, "Resolving random landmark");

        let building = self.resolver.resolve_default(query).await?;
        let coordinate = self.rng.with(|rng| self.jitter.apply(building.center, rng));

        Ok(ResolvedLocation::new(coordinate, Some(region), self.clock.now()))
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::cache::LocationCache;
    use crate::clock::ManualClock;
    use crate::coord::{Coordinate, Region};
    use crate::lookup::{EndpointRouter, HttpResponse, MockAsyncHttpClient, ResolverConfig};
    use std::time::Duration;

    const BODY: &[u8] = br#"{"elements":[{"center":{"lat":48.0,"lon":2.0}}]}"#;

    /// Source over a single Europe region with no request throttle.
    pub fn test_source(
        client: MockAsyncHttpClient,
        jitter: JitterConfig,
        clock: ManualClock,
    ) -> LocationSource<MockAsyncHttpClient> {
        let rng = SharedRng::seeded(11);
        let router = Arc::new(
            EndpointRouter::new(["https://a.example/api"], 3, rng.clone()).unwrap(),
        );
        let resolver = LandmarkResolver::new(
            client,
            router,
            Arc::new(LocationCache::new(100)),
            ResolverConfig {
                request_delay: Duration::ZERO,
                ..ResolverConfig::default()
            },
        );
        let sampler =
            RegionSampler::new(vec![Region::new("europe", 43.0, 52.0, -5.0, 10.0).unwrap()])
                .unwrap();
        LocationSource::new(sampler, resolver, jitter, rng, Arc::new(clock))
    }

    #[tokio::test]
    async fn test_resolve_random_stamps_and_names() {
        let clock = ManualClock::starting_now();
        let src = test_source(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec()))),
            JitterConfig::disabled(),
            clock.clone(),
        );

        let flight = src.begin().await;
        let loc = src.resolve_random(&flight).await.unwrap();
        assert_eq!(loc.coordinate, Coordinate::new(48.0, 2.0));
        assert_eq!(loc.name, "48.000000,2.000000");
        assert_eq!(loc.region.as_deref(), Some("europe"));
        assert_eq!(loc.generated_at, clock.now());
    }

    #[tokio::test]
    async fn test_single_flight_slot() {
        let src = test_source(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(BODY.to_vec()))),
            JitterConfig::disabled(),
            ManualClock::starting_now(),
        );

        let held = src.try_begin().expect("slot free");
        assert!(src.is_busy());
        assert!(src.try_begin().is_none());
        drop(held);
        assert!(!src.is_busy());
        assert!(src.try_begin().is_some());
    }

    #[tokio::test]
    async fn test_not_found_propagates() {
        let src = test_source(
            MockAsyncHttpClient::always(Ok(HttpResponse::ok(br#"{"elements":[]}"#.to_vec()))),
            JitterConfig::default(),
            ManualClock::starting_now(),
        );
        let flight = src.begin().await;
        let err = src.resolve_random(&flight).await.unwrap_err();
        assert!(matches!(err, LookupError::NotFound { .. }));
    }
}
