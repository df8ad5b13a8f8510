//! Location service: prefetching producer plus consumer policy.
//!
//! [`ServiceBuilder`] turns a [`ConfigFile`](crate::config::ConfigFile) into a
//! ready [`LocationService`]. The service starts its producer lazily on the
//! first request and serves from the queue, falling back to synchronous
//! resolution when the queue cannot.

mod builder;
mod consumer;
mod error;
mod location_service;

pub use builder::ServiceBuilder;
pub use consumer::{
    ConsumerConfig, DEFAULT_CONSUME_MAX_AGE, DEFAULT_RANDOM_PICK_MIN_QUEUED,
    DEFAULT_RANDOM_PICK_PROBABILITY, DEFAULT_SYNC_ATTEMPTS, DEFAULT_SYNC_ATTEMPT_TIMEOUT,
};
pub use error::{GenerationError, ServiceError};
pub use location_service::LocationService;
