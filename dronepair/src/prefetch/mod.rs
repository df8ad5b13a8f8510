//! Background prefetching of resolved landmark locations.
//!
//! External lookups are slow and rate limited, while callers want a location
//! immediately. A single producer task keeps a bounded queue filled ahead of
//! demand:
//!
//! ```text
//!                   ┌──────────────────────┐
//!  LocationSource ─►│  PrefetchProducer    │── push ──► LocationQueue ──► consumer
//!                   │  (state machine)     │              (bounded)
//!                   └──────────────────────┘
//!                      │ queue full → pause 30 s
//!                      │ success    → adaptive delay (2 s … ~14 s)
//!                      │ failure    → exponential backoff (0.5 s … 10 s)
//!                      └ every 5 min → drop entries older than 30 min
//! ```

mod config;
mod producer;
mod queue;
mod state;

pub use config::{
    BackoffPolicy, PrefetchConfig, DEFAULT_BACKOFF_CEILING, DEFAULT_BACKOFF_INITIAL,
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BACKOFF_PLATEAU, DEFAULT_BACKOFF_PLATEAU_AFTER,
    DEFAULT_BASE_DELAY, DEFAULT_BUSY_RETRY, DEFAULT_CLEANUP_INTERVAL, DEFAULT_MAX_QUEUED_AGE,
    DEFAULT_PAUSE_DURATION, DEFAULT_PAUSE_RECHECK, DEFAULT_QUEUE_CAPACITY, OCCUPANCY_GAIN,
    SLOWDOWN_FACTOR, SLOWDOWN_THRESHOLD,
};
pub use producer::{PrefetchProducer, ProducerStatus};
pub use queue::LocationQueue;
pub use state::{
    after_fetch, plan_step, FetchOutcome, ProducerState, StepInput, StepPlan, Transition,
};
