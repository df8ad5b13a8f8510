//! Landmark resolution against the rate-limited lookup service.
//!
//! # Request protocol
//!
//! ```text
//! cache hit ──────────────────────────────────────────► return cached center
//! cache miss ─► sleep(request_delay) ─► select endpoint ─► GET with deadline
//!                                                          │
//!                       429 ─► one immediate retry on an alternate endpoint
//!                       2xx ─► parse center ─► cache put ─► return
//! ```
//!
//! Every endpoint that is contacted gets a success or failure recorded with
//! the router, whatever the final outcome of the resolution. A request
//! abandoned by a caller's deadline is recorded as a failure.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::http::AsyncHttpClient;
use super::query::{self, DEFAULT_SEARCH_RADIUS_M};
use super::router::EndpointRouter;
use super::types::{BuildingCenter, LookupError};
use crate::cache::{CacheKey, LocationCache};
use crate::coord::Coordinate;

/// Default per-request deadline.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause before every external request.
///
/// The public lookup instances share a global rate limit, so every request
/// is preceded by this delay regardless of which endpoint serves it.
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(1);

/// Resolver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Deadline for one request.
    pub request_timeout: Duration,
    /// Mandatory delay before each external request.
    pub request_delay: Duration,
    /// Retry once on an alternate endpoint after HTTP 429.
    pub retry_on_rate_limit: bool,
    /// Default search radius for [`LandmarkResolver::resolve_default`].
    pub search_radius_m: u32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            request_delay: DEFAULT_REQUEST_DELAY,
            retry_on_rate_limit: true,
            search_radius_m: DEFAULT_SEARCH_RADIUS_M,
        }
    }
}

/// Resolves sampled coordinates to the center of the nearest building.
pub struct LandmarkResolver<C: AsyncHttpClient> {
    client: C,
    router: Arc<EndpointRouter>,
    cache: Arc<LocationCache>,
    config: ResolverConfig,
}

impl<C: AsyncHttpClient> LandmarkResolver<C> {
    /// Creates a resolver.
    ///
    /// # Arguments
    ///
    /// * `client` - HTTP client used for lookups
    /// * `router` - Endpoint selection and health tracking
    /// * `cache` - Cache of previously resolved locations
    /// * `config` - Timeouts, throttle and retry settings
    pub fn new(
        client: C,
        router: Arc<EndpointRouter>,
        cache: Arc<LocationCache>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            client,
            router,
            cache,
            config,
        }
    }

    /// Resolver settings.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// The shared endpoint router.
    pub fn router(&self) -> &Arc<EndpointRouter> {
        &self.router
    }

    /// The shared location cache.
    pub fn cache(&self) -> &Arc<LocationCache> {
        &self.cache
    }

    /// Resolves `coord` with the configured search radius.
    pub async fn resolve_default(&self, coord: Coordinate) -> Result<BuildingCenter, LookupError> {
        self.resolve(coord, self.config.search_radius_m).await
    }

    /// Finds the nearest building within `radius_m` of `coord`.
    ///
    /// # Errors
    ///
    /// * [`LookupError::NotFound`] - no building within the radius
    /// * [`LookupError::RateLimited`] - 429 from both the chosen and the
    ///   alternate endpoint
    /// * [`LookupError::Timeout`] - the request deadline elapsed
    /// * [`LookupError::Unavailable`] - other non-2xx or transport failure
    pub async fn resolve(
        &self,
        coord: Coordinate,
        radius_m: u32,
    ) -> Result<BuildingCenter, LookupError> {
        let key = CacheKey::from_coordinate(&coord);
        if let Some(center) = self.cache.get(&key) {
            debug!(key = %key, "Landmark served from cache");
            return Ok(BuildingCenter {
                query: coord,
                center,
                from_cache: true,
            });
        }

        tokio::time::sleep(self.config.request_delay).await;

        let endpoint = self.router.select_endpoint();
        let center = match self.attempt(&endpoint, coord, radius_m).await {
            Err(LookupError::RateLimited { .. }) if self.config.retry_on_rate_limit => {
                let alternate = self.router.select_alternate(&endpoint);
                warn!(
                    endpoint = %endpoint,
                    alternate = %alternate,
                    "Lookup rate limited, retrying on alternate endpoint"
                );
                self.attempt(&alternate, coord, radius_m).await?
            }
            other => other?,
        };

        self.cache.put(key, center);
        debug!(query = %coord, center = %center, "Landmark resolved");

        Ok(BuildingCenter {
            query: coord,
            center,
            from_cache: false,
        })
    }

    /// One request against one endpoint, with health bookkeeping.
    async fn attempt(
        &self,
        endpoint: &str,
        coord: Coordinate,
        radius_m: u32,
    ) -> Result<Coordinate, LookupError> {
        let outcome = PendingOutcome::new(&self.router, endpoint);
        let url = match query::request_url(endpoint, coord, radius_m) {
            Ok(url) => url,
            Err(e) => {
                outcome.failure();
                return Err(e);
            }
        };
        let started = Instant::now();

        let response =
            match tokio::time::timeout(self.config.request_timeout, self.client.get(&url)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    outcome.failure();
                    return Err(rebind_endpoint(e, endpoint));
                }
                Err(_) => {
                    outcome.failure();
                    return Err(LookupError::Timeout {
                        endpoint: endpoint.to_string(),
                        after: self.config.request_timeout,
                    });
                }
            };
        let latency = started.elapsed();

        if response.status == 429 {
            outcome.failure();
            return Err(LookupError::RateLimited {
                endpoint: endpoint.to_string(),
            });
        }
        if !response.is_success() {
            outcome.failure();
            return Err(LookupError::Unavailable {
                endpoint: endpoint.to_string(),
                reason: format!("HTTP {}", response.status),
            });
        }

        let result = query::parse_building_center(endpoint, &response.body, coord, radius_m);
        match &result {
            Err(e) if e.is_endpoint_failure() => outcome.failure(),
            _ => outcome.success(latency),
        }
        result
    }
}

/// Health record for one contacted endpoint.
///
/// Dropped without being settled (the caller gave up on the request) it
/// counts as a failure.
struct PendingOutcome<'a> {
    router: &'a EndpointRouter,
    endpoint: &'a str,
    settled: bool,
}

impl<'a> PendingOutcome<'a> {
    fn new(router: &'a EndpointRouter, endpoint: &'a str) -> Self {
        Self {
            router,
            endpoint,
            settled: false,
        }
    }

    fn success(mut self, latency: Duration) {
        self.settled = true;
        self.router.record_success(self.endpoint, latency);
    }

    fn failure(mut self) {
        self.settled = true;
        self.router.record_failure(self.endpoint);
    }
}

impl Drop for PendingOutcome<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(endpoint = %self.endpoint, "Lookup abandoned mid-request");
            self.router.record_failure(self.endpoint);
        }
    }
}

/// Reports transport errors against the endpoint, not the full query URL.
fn rebind_endpoint(error: LookupError, endpoint: &str) -> LookupError {
    match error {
        LookupError::Timeout { after, .. } => LookupError::Timeout {
            endpoint: endpoint.to_string(),
            after,
        },
        LookupError::Unavailable { reason, .. } => LookupError::Unavailable {
            endpoint: endpoint.to_string(),
            reason,
        },
        other => other,
    }
}
