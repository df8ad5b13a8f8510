//! Lookup result and error types.

use std::time::Duration;

use thiserror::Error;

use crate::coord::Coordinate;

/// Errors returned by the landmark lookup.
///
/// Every variant except [`LookupError::NoEndpoints`] and
/// [`LookupError::Client`] is retryable with a fresh coordinate or after a
/// pause.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    /// The service answered but found no building within the radius.
    #[error("no building found within {radius_m} m of {query}")]
    NotFound { query: Coordinate, radius_m: u32 },

    /// The service answered HTTP 429.
    #[error("rate limited by {endpoint}")]
    RateLimited { endpoint: String },

    /// The request did not complete before its deadline.
    #[error("request to {endpoint} timed out after {after:?}")]
    Timeout { endpoint: String, after: Duration },

    /// Any other non-success status or transport failure.
    #[error("{endpoint} unavailable: {reason}")]
    Unavailable { endpoint: String, reason: String },

    /// The response body did not match the expected JSON shape.
    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    /// The router was built without any endpoints.
    #[error("no lookup endpoints configured")]
    NoEndpoints,

    /// The HTTP client could not be constructed.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl LookupError {
    /// Whether the error says something about endpoint health.
    ///
    /// `NotFound` is a valid answer from a healthy endpoint.
    pub fn is_endpoint_failure(&self) -> bool {
        matches!(
            self,
            LookupError::RateLimited { .. }
                | LookupError::Timeout { .. }
                | LookupError::Unavailable { .. }
                | LookupError::InvalidResponse { .. }
        )
    }
}

/// Center of the building nearest to a query coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BuildingCenter {
    /// Coordinate that was looked up.
    pub query: Coordinate,
    /// Centroid reported by the service (or the query when absent).
    pub center: Coordinate,
    /// Whether the answer came from the location cache.
    pub from_cache: bool,
}
