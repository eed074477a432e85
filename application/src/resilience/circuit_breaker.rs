//! Circuit breaker
//!
//! Contains transient remote failures per provider instead of letting them
//! cascade into every caller.
//!
//! # State Transitions
//!
//! ```text
//!            failures >= failure_threshold
//!   Closed ─────────────────────────────────▶ Open
//!     ▲                                      │  ▲
//!     │ successes >= success_threshold       │  │ any failure
//!     │                                      ▼  │
//!     └──────────────────────────────────── HalfOpen
//!                     (first call after opens_until)
//! ```
//!
//! Outcomes are applied under a mutex as each call resolves. Every
//! transition bumps a generation counter; outcomes of calls admitted under an
//! older generation are discarded so a slow call from before an outage cannot
//! close a breaker that has since reopened.

use crate::config::BreakerParams;
use serde::Serialize;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    #[default]
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Returns valid transitions from this state
    const fn valid_transitions(&self) -> &'static [CircuitState] {
        match self {
            CircuitState::Closed => &[CircuitState::Open],
            CircuitState::Open => &[CircuitState::HalfOpen],
            CircuitState::HalfOpen => &[CircuitState::Closed, CircuitState::Open],
        }
    }

    fn can_transition_to(&self, target: CircuitState) -> bool {
        self.valid_transitions().contains(&target)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`CircuitBreaker::execute`].
///
/// `Operation` carries the wrapped operation's own error untouched; the other
/// variants mean the breaker itself stopped or abandoned the call.
#[derive(Error, Debug)]
pub enum BreakerError<E> {
    #[error("circuit breaker open: breaker={name} retry_after_ms={}", retry_after.as_millis())]
    Open { name: String, retry_after: Duration },

    #[error("call timed out: breaker={name} timeout_ms={}", timeout.as_millis())]
    TimedOut { name: String, timeout: Duration },

    #[error("call aborted before completion: breaker={name}")]
    Aborted { name: String },

    #[error(transparent)]
    Operation(E),
}

impl<E> BreakerError<E> {
    /// Whether the breaker failed fast without running the operation.
    pub fn is_open(&self) -> bool {
        matches!(self, BreakerError::Open { .. })
    }

    pub fn into_operation(self) -> Option<E> {
        match self {
            BreakerError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

/// Point-in-time view of a breaker, for diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
    pub half_open_in_flight: u32,
    /// Time left before trial calls are allowed (only while open).
    pub remaining_open: Option<Duration>,
    /// How many times the breaker has opened.
    pub open_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    /// Error the caller excluded from failure accounting.
    Ignored,
}

#[derive(Debug, Clone, Copy)]
struct Admission {
    generation: u64,
    trial: bool,
}

#[derive(Debug, Default)]
struct BreakerState {
    status: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opens_until: Option<Instant>,
    half_open_in_flight: u32,
    generation: u64,
    open_count: u64,
}

struct BreakerCore {
    name: String,
    params: BreakerParams,
    state: Mutex<BreakerState>,
}

impl BreakerCore {
    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn admit(&self) -> Result<Admission, Duration> {
        let now = Instant::now();
        let mut state = self.lock();

        match state.status {
            CircuitState::Closed => Ok(Admission {
                generation: state.generation,
                trial: false,
            }),
            CircuitState::Open => {
                let opens_until = state.opens_until.unwrap_or(now);
                if now < opens_until {
                    return Err(opens_until.saturating_duration_since(now));
                }
                self.transition(&mut state, CircuitState::HalfOpen);
                self.admit_trial(&mut state)
            }
            CircuitState::HalfOpen => self.admit_trial(&mut state),
        }
    }

    fn admit_trial(&self, state: &mut BreakerState) -> Result<Admission, Duration> {
        if state.half_open_in_flight >= self.params.half_open_max_calls.max(1) {
            return Err(Duration::ZERO);
        }
        state.half_open_in_flight += 1;
        Ok(Admission {
            generation: state.generation,
            trial: true,
        })
    }

    fn record(&self, admission: Admission, outcome: Outcome) {
        let mut state = self.lock();

        if admission.generation != state.generation {
            debug!(breaker = %self.name, ?outcome, "Discarding outcome from previous breaker generation");
            return;
        }
        if admission.trial {
            state.half_open_in_flight = state.half_open_in_flight.saturating_sub(1);
        }

        match (state.status, outcome) {
            (_, Outcome::Ignored) => {}
            (CircuitState::Closed, Outcome::Success) => state.consecutive_failures = 0,
            (CircuitState::Closed, Outcome::Failure) => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.params.failure_threshold.max(1) {
                    self.transition(&mut state, CircuitState::Open);
                }
            }
            (CircuitState::HalfOpen, Outcome::Success) => {
                state.consecutive_successes += 1;
                if state.consecutive_successes >= self.params.success_threshold.max(1) {
                    self.transition(&mut state, CircuitState::Closed);
                }
            }
            (CircuitState::HalfOpen, Outcome::Failure) => {
                self.transition(&mut state, CircuitState::Open);
            }
            (CircuitState::Open, _) => {}
        }
    }

    fn transition(&self, state: &mut BreakerState, target: CircuitState) {
        debug_assert!(
            state.status.can_transition_to(target),
            "Invalid circuit state transition: {:?} -> {:?}",
            state.status,
            target
        );
        let from = state.status;
        state.status = target;
        state.generation += 1;
        state.consecutive_successes = 0;
        state.half_open_in_flight = 0;

        match target {
            CircuitState::Open => {
                state.opens_until = Some(Instant::now() + self.params.reset_timeout);
                state.open_count += 1;
                warn!(
                    breaker = %self.name,
                    %from,
                    consecutive_failures = state.consecutive_failures,
                    reset_timeout_ms = self.params.reset_timeout.as_millis() as u64,
                    "Circuit breaker opened"
                );
            }
            CircuitState::HalfOpen => {
                info!(breaker = %self.name, "Circuit breaker half-open, allowing trial calls");
            }
            CircuitState::Closed => {
                state.consecutive_failures = 0;
                state.opens_until = None;
                info!(breaker = %self.name, "Circuit breaker closed");
            }
        }
    }
}

/// Records the outcome of an admitted call exactly once.
///
/// Dropping it unrecorded (the operation panicked) counts as a failure, so a
/// half-open trial slot is never leaked.
struct OutcomeRecorder {
    core: Arc<BreakerCore>,
    admission: Admission,
    recorded: bool,
}

impl OutcomeRecorder {
    fn record(mut self, outcome: Outcome) {
        self.recorded = true;
        self.core.record(self.admission, outcome);
    }
}

impl Drop for OutcomeRecorder {
    fn drop(&mut self) {
        if !self.recorded {
            self.core.record(self.admission, Outcome::Failure);
        }
    }
}

enum CallFailure<E> {
    Operation(E),
    TimedOut(Duration),
}

/// Fault-isolation state machine for one named resource.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CircuitBreaker {
    core: Arc<BreakerCore>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, params: BreakerParams) -> Self {
        Self {
            core: Arc::new(BreakerCore {
                name: name.into(),
                params,
                state: Mutex::new(BreakerState::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn params(&self) -> &BreakerParams {
        &self.core.params
    }

    /// Nominal state. An open breaker stays `Open` until the next call after
    /// its reset timeout moves it to `HalfOpen`.
    pub fn state(&self) -> CircuitState {
        self.core.lock().status
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let state = self.core.lock();
        let remaining_open = match (state.status, state.opens_until) {
            (CircuitState::Open, Some(until)) => {
                Some(until.saturating_duration_since(Instant::now()))
            }
            _ => None,
        };
        BreakerSnapshot {
            name: self.core.name.clone(),
            state: state.status,
            consecutive_failures: state.consecutive_failures,
            consecutive_successes: state.consecutive_successes,
            half_open_in_flight: state.half_open_in_flight,
            remaining_open,
            open_count: state.open_count,
        }
    }

    /// Force the breaker back to `Closed`, discarding in-flight outcomes.
    pub fn reset(&self) {
        let mut state = self.core.lock();
        let open_count = state.open_count;
        let generation = state.generation + 1;
        *state = BreakerState {
            generation,
            open_count,
            ..BreakerState::default()
        };
        info!(breaker = %self.core.name, "Circuit breaker reset");
    }

    /// Run `operation` through the breaker. Every error counts as a failure.
    pub async fn execute<T, E, F, Fut>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        self.execute_classified(operation, |_: &E| true).await
    }

    /// Run `operation` through the breaker, counting only errors for which
    /// `counts_as_failure` returns `true`.
    ///
    /// The operation runs on its own task: a caller that stops waiting does
    /// not stop the outcome from being recorded.
    pub async fn execute_classified<T, E, F, Fut, C>(
        &self,
        operation: F,
        counts_as_failure: C,
    ) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        C: FnOnce(&E) -> bool + Send + 'static,
    {
        let admission = self.core.admit().map_err(|retry_after| {
            debug!(breaker = %self.core.name, ?retry_after, "Circuit breaker rejected call");
            BreakerError::Open {
                name: self.core.name.clone(),
                retry_after,
            }
        })?;

        let recorder = OutcomeRecorder {
            core: Arc::clone(&self.core),
            admission,
            recorded: false,
        };
        let call_timeout = self.core.params.call_timeout;
        let future = operation();

        let task = tokio::spawn(async move {
            let result = match call_timeout {
                Some(limit) => match tokio::time::timeout(limit, future).await {
                    Ok(result) => result.map_err(CallFailure::Operation),
                    Err(_) => Err(CallFailure::TimedOut(limit)),
                },
                None => future.await.map_err(CallFailure::Operation),
            };

            let outcome = match &result {
                Ok(_) => Outcome::Success,
                Err(CallFailure::TimedOut(_)) => Outcome::Failure,
                Err(CallFailure::Operation(e)) => {
                    if counts_as_failure(e) {
                        Outcome::Failure
                    } else {
                        Outcome::Ignored
                    }
                }
            };
            recorder.record(outcome);
            result
        });

        match task.await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(CallFailure::Operation(e))) => Err(BreakerError::Operation(e)),
            Ok(Err(CallFailure::TimedOut(timeout))) => Err(BreakerError::TimedOut {
                name: self.core.name.clone(),
                timeout,
            }),
            Err(join_error) if join_error.is_panic() => {
                std::panic::resume_unwind(join_error.into_panic())
            }
            Err(_) => Err(BreakerError::Aborted {
                name: self.core.name.clone(),
            }),
        }
    }
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.core.name)
            .field("state", &self.state())
            .finish()
    }
}
