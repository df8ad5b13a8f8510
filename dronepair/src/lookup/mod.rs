//! Landmark lookup against public Overpass instances.
//!
//! This module turns a sampled coordinate into the center of the nearest
//! building. Requests are spread over several interchangeable endpoints by
//! the [`EndpointRouter`], throttled and deadline-bounded by the
//! [`LandmarkResolver`], and remembered in the location cache.
//!
//! ```ignore
//! use dronepair::lookup::{EndpointRouter, LandmarkResolver, ReqwestClient, ResolverConfig};
//!
//! let router = Arc::new(EndpointRouter::new(endpoints, 3, rng)?);
//! let resolver = LandmarkResolver::new(ReqwestClient::new()?, router, cache, ResolverConfig::default());
//! let building = resolver.resolve(Coordinate::new(48.85, 2.35), 500).await?;
//! ```

mod http;
mod query;
mod resolver;
mod router;
mod types;

pub use http::{AsyncHttpClient, HttpResponse, ReqwestClient, DEFAULT_CLIENT_TIMEOUT_SECS};
pub use query::{
    building_query, parse_building_center, request_url, DEFAULT_SEARCH_RADIUS_M,
    QUERY_TIMEOUT_SECS,
};
pub use resolver::{
    LandmarkResolver, ResolverConfig, DEFAULT_REQUEST_DELAY, DEFAULT_REQUEST_TIMEOUT,
};
pub use router::{EndpointRecord, EndpointRouter, DEFAULT_FAILURE_THRESHOLD, SELECTION_POOL_SIZE};
pub use types::{BuildingCenter, LookupError};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;

/// Public Overpass API instances used when none are configured.
pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
    "https://overpass.private.coffee/api/interpreter",
    "https://maps.mail.ru/osm/tools/overpass/api/interpreter",
];
