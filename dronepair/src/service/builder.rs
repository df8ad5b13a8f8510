//! Assembles a [`LocationService`] from a [`ConfigFile`].

use std::sync::Arc;

use tracing::info;

use super::error::ServiceError;
use super::location_service::LocationService;
use crate::cache::LocationCache;
use crate::clock::{Clock, SharedRng, SystemClock};
use crate::config::ConfigFile;
use crate::camera::CameraPlacer;
use crate::coord::RegionSampler;
use crate::correspondence::PairGenerator;
use crate::location::LocationSource;
use crate::lookup::{
    AsyncHttpClient, EndpointRouter, LandmarkResolver, ReqwestClient, DEFAULT_ENDPOINTS,
};

/// Builder wiring the router, cache, resolver and sampler together.
///
/// Randomness and time default to the OS entropy source and the system
/// clock; both can be replaced for reproducible runs.
pub struct ServiceBuilder<'a> {
    config: &'a ConfigFile,
    rng: Option<SharedRng>,
    clock: Option<Arc<dyn Clock>>,
}

impl<'a> ServiceBuilder<'a> {
    pub fn new(config: &'a ConfigFile) -> Self {
        Self {
            config,
            rng: None,
            clock: None,
        }
    }

    /// Uses `rng` for sampling, jitter, endpoint choice and queue picks.
    pub fn rng(mut self, rng: SharedRng) -> Self {
        self.rng = Some(rng);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the camera pair generator from the placement and validation
    /// settings, sharing this builder's randomness.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Placement`] when the placement ranges are invalid.
    pub fn pair_generator(&self) -> Result<PairGenerator, ServiceError> {
        let placer = CameraPlacer::new(self.config.camera.clone())?;
        let rng = self.rng.clone().unwrap_or_default();
        Ok(PairGenerator::new(placer, self.config.validator(), rng))
    }

    /// Builds a service talking to the configured endpoints over HTTPS.
    pub fn build(self) -> Result<LocationService<ReqwestClient>, ServiceError> {
        let client = ReqwestClient::new()?;
        self.build_with_client(client)
    }

    /// Builds a service using `client` for lookups.
    ///
    /// # Errors
    ///
    /// * [`ServiceError::NoRegions`] - the configuration has no regions
    /// * [`ServiceError::Lookup`] - the endpoint router could not be built
    pub fn build_with_client<C: AsyncHttpClient + 'static>(
        self,
        client: C,
    ) -> Result<LocationService<C>, ServiceError> {
        let config = self.config;
        let rng = self.rng.unwrap_or_default();
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock) as Arc<dyn Clock>);

        let sampler =
            RegionSampler::new(config.regions.clone()).ok_or(ServiceError::NoRegions)?;

        let endpoints: Vec<String> = if config.lookup.endpoints.is_empty() {
            DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect()
        } else {
            config.lookup.endpoints.clone()
        };
        let router = Arc::new(EndpointRouter::new(
            endpoints.iter().cloned(),
            config.lookup.failure_threshold,
            rng.clone(),
        )?);

        let cache = Arc::new(LocationCache::new(config.cache_max_entries));
        let resolver = LandmarkResolver::new(client, router, cache, config.resolver_config());
        let source = LocationSource::new(sampler, resolver, config.jitter(), rng, clock);

        info!(
            regions = config.regions.len(),
            endpoints = endpoints.len(),
            queue_capacity = config.prefetch.capacity,
            "Location service configured"
        );

        Ok(LocationService::new(
            source,
            config.prefetch_config(),
            config.consumer_config(),
        ))
    }
}
