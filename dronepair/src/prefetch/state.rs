//! Producer state machine.
//!
//! Every decision the producer makes is a pure function of its inputs, so
//! the schedule can be tested without running the loop.
//!
//! # State Machine
//!
//! ```text
//!            ┌───────── queue full ─────────┐
//!            ▼                              │
//!         Paused ──[pause elapsed]──► Idle ─┴─[slot free]──► Fetching
//!            ▲                        ▲  ▲                     │
//!            └──[still full]──────────┘  │        success ◄────┤
//!                                        │  (adaptive delay)   │
//!                                        └── Backoff ◄─────────┘
//!                                           (exponential)   failure
//! ```

use std::time::Duration;

use tokio::time::Instant;

use super::config::PrefetchConfig;

/// What the producer is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProducerState {
    /// Waiting for the next scheduled step.
    #[default]
    Idle,
    /// A lookup is outstanding.
    Fetching,
    /// Queue full; no lookups until the pause elapses.
    Paused,
    /// Waiting out a failure backoff.
    Backoff,
}

impl ProducerState {
    /// Short label for status output.
    pub fn display_status(&self) -> &'static str {
        match self {
            ProducerState::Idle => "Idle",
            ProducerState::Fetching => "Fetching",
            ProducerState::Paused => "Paused (queue full)",
            ProducerState::Backoff => "Backing off",
        }
    }
}

/// Inputs to one planning decision.
#[derive(Debug, Clone, Copy)]
pub struct StepInput {
    pub queue_len: usize,
    pub now: Instant,
    pub paused_until: Option<Instant>,
    /// Whether another caller holds the single-flight slot.
    pub busy: bool,
}

/// Outcome of planning one producer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepPlan {
    /// Still inside a pause window; look again after `recheck`.
    StillPaused { recheck: Duration },
    /// Queue is full; pause until `until`, rechecking every `recheck`.
    EnterPause { until: Instant, recheck: Duration },
    /// Another lookup is outstanding; retry shortly.
    Busy { retry: Duration },
    /// Resolve one location now.
    Fetch,
}

/// Decides what the next producer step does.
pub fn plan_step(config: &PrefetchConfig, input: StepInput) -> StepPlan {
    if let Some(until) = input.paused_until {
        if input.now < until {
            return StepPlan::StillPaused {
                recheck: config.pause_recheck,
            };
        }
    }

    if input.queue_len >= config.capacity {
        return StepPlan::EnterPause {
            until: input.now + config.pause_duration,
            recheck: config.pause_recheck,
        };
    }

    if input.busy {
        return StepPlan::Busy {
            retry: config.busy_retry,
        };
    }

    StepPlan::Fetch
}

/// Result of one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A location was resolved and queued.
    Queued,
    /// A location was resolved but the queue filled up in the meantime.
    Dropped,
    /// The lookup failed.
    Failed,
}

/// State, delay and error streak after a fetch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub state: ProducerState,
    pub delay: Duration,
    pub consecutive_errors: u32,
}

/// Schedules the step following a fetch.
///
/// # Arguments
///
/// * `outcome` - What the fetch produced
/// * `consecutive_errors` - Failure streak before this fetch
/// * `queue_len` - Queue length after the fetch
pub fn after_fetch(
    config: &PrefetchConfig,
    outcome: FetchOutcome,
    consecutive_errors: u32,
    queue_len: usize,
) -> Transition {
    match outcome {
        FetchOutcome::Queued | FetchOutcome::Dropped => Transition {
            state: ProducerState::Idle,
            delay: config.adaptive_delay(queue_len),
            consecutive_errors: 0,
        },
        FetchOutcome::Failed => {
            let errors = consecutive_errors.saturating_add(1);
            Transition {
                state: ProducerState::Backoff,
                delay: config.backoff.delay_for(errors),
                consecutive_errors: errors,
            }
        }
    }
}
