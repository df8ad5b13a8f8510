//! Service error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::camera::PlacementError;
use crate::lookup::LookupError;

/// Errors from obtaining a location.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerationError {
    /// Nothing is queued. The consumer falls back to synchronous resolution.
    #[error("prefetch queue is empty")]
    QueueEmpty,

    /// The queued entry was too old to hand out.
    #[error("queued location was stale ({age:?} old)")]
    Stale { age: Duration },

    /// Every synchronous attempt failed.
    #[error("could not generate a location after {attempts} attempts")]
    Exhausted { attempts: u32 },
}

/// Errors building a service from configuration.
#[derive(Debug)]
pub enum ServiceError {
    /// The configuration defines no sampling regions.
    NoRegions,

    /// The lookup client or router could not be built.
    Lookup(LookupError),

    /// Camera placement ranges are invalid.
    Placement(PlacementError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::NoRegions => write!(f, "No sampling regions configured"),
            ServiceError::Lookup(e) => write!(f, "Failed to set up landmark lookup: {}", e),
            ServiceError::Placement(e) => write!(f, "Invalid camera placement: {}", e),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::NoRegions => None,
            ServiceError::Lookup(e) => Some(e),
            ServiceError::Placement(e) => Some(e),
        }
    }
}

impl From<LookupError> for ServiceError {
    fn from(e: LookupError) -> Self {
        ServiceError::Lookup(e)
    }
}

impl From<PlacementError> for ServiceError {
    fn from(e: PlacementError) -> Self {
        ServiceError::Placement(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_generation_error_display() {
        let err = GenerationError::Exhausted { attempts: 5 };
        assert_eq!(err.to_string(), "could not generate a location after 5 attempts");
    }

    #[test]
    fn test_placement_error_wrapped() {
        let err = ServiceError::from(PlacementError::InvertedRange {
            name: "height",
            min: 10.0,
            max: 5.0,
        });
        assert!(err.to_string().starts_with("Invalid camera placement"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_service_error_source() {
        let err = ServiceError::from(LookupError::NoEndpoints);
        assert!(err.to_string().contains("no lookup endpoints"));
        assert!(err.source().is_some());
        assert!(ServiceError::NoRegions.source().is_none());
    }
}
