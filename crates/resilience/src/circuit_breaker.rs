//! Failure-rate circuit breaker.
//!
//! State transitions:
//! ```text
//!            failure rate >= threshold
//! Closed ─────────────────────────────► Open
//!   ▲                                    │ cooldown elapsed
//!   │ trial ok                           ▼
//!   └────────────────────────────── HalfOpen ──► Open (trial failed)
//! ```
//!
//! One breaker instance guards one downstream dependency and is shared by
//! every caller. All bookkeeping happens under a single mutex that is never
//! held across an await point, so concurrent outcomes cannot lose a trip.

use std::collections::VecDeque;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;

use crate::error::{ResilienceError, Transient};

/// Circuit breaker settings.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Failure ratio (0.0-1.0) at or above which the breaker opens.
    pub failure_rate_threshold: f64,
    /// Number of most recent outcomes the failure rate is computed over.
    pub window_size: usize,
    /// Outcomes required in the window before the rate is evaluated.
    pub minimum_calls: usize,
    /// Time spent open before a trial call is admitted.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            window_size: 10,
            minimum_calls: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Externally visible breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through.
    Closed,
    /// Calls are rejected without reaching the dependency.
    Open,
    /// A single trial call is allowed to probe recovery.
    HalfOpen,
}

impl CircuitState {
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
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
enum Phase {
    Closed,
    Open { opened_at: Instant },
    HalfOpen { trial_in_flight: bool },
}

impl Phase {
    fn state(&self) -> CircuitState {
        match self {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

#[derive(Debug)]
struct Shared {
    phase: Phase,
    /// Recent outcomes while closed, `true` meaning failure.
    window: VecDeque<bool>,
}

/// Guards calls to one downstream dependency.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    shared: Mutex<Shared>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let window = VecDeque::with_capacity(config.window_size);
        Self {
            name: name.into(),
            config,
            shared: Mutex::new(Shared {
                phase: Phase::Closed,
                window,
            }),
        }
    }

    /// Returns the current state, moving an expired `Open` to `HalfOpen`.
    pub fn state(&self) -> CircuitState {
        let mut shared = self.shared.lock();
        self.expire_cooldown(&mut shared);
        shared.phase.state()
    }

    /// Runs `f` if the breaker admits the call.
    ///
    /// Transient failures count against the breaker; any other error means
    /// the dependency answered and counts as a success. If the returned
    /// future is dropped mid-call no outcome is recorded.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Transient,
    {
        let permit = self.try_acquire().ok_or_else(|| ResilienceError::CircuitOpen {
            breaker: self.name.clone(),
        })?;

        match f().await {
            Ok(value) => {
                permit.record(false);
                Ok(value)
            }
            Err(e) => {
                permit.record(e.is_transient());
                Err(ResilienceError::Inner(e))
            }
        }
    }

    fn try_acquire(&self) -> Option<Permit<'_>> {
        let mut shared = self.shared.lock();
        self.expire_cooldown(&mut shared);

        let trial = match &mut shared.phase {
            Phase::Closed => false,
            Phase::HalfOpen { trial_in_flight } if !*trial_in_flight => {
                *trial_in_flight = true;
                true
            }
            Phase::Open { .. } | Phase::HalfOpen { .. } => {
                metrics::counter!("circuit_breaker_rejections_total", "breaker" => self.name.clone())
                    .increment(1);
                tracing::debug!(breaker = %self.name, "call rejected by open circuit");
                return None;
            }
        };

        Some(Permit {
            breaker: self,
            trial,
            recorded: false,
        })
    }

    fn expire_cooldown(&self, shared: &mut Shared) {
        if let Phase::Open { opened_at } = shared.phase
            && opened_at.elapsed() >= self.config.cooldown
        {
            self.transition(
                shared,
                Phase::HalfOpen {
                    trial_in_flight: false,
                },
            );
        }
    }

    fn on_outcome(&self, trial: bool, failed: bool) {
        let mut shared = self.shared.lock();

        match shared.phase {
            Phase::HalfOpen { .. } if trial => {
                if failed {
                    self.open(&mut shared);
                } else {
                    shared.window.clear();
                    self.transition(&mut shared, Phase::Closed);
                }
            }
            Phase::Closed if !trial => {
                if shared.window.len() == self.config.window_size.max(1) {
                    shared.window.pop_front();
                }
                shared.window.push_back(failed);

                let calls = shared.window.len();
                let failures = shared.window.iter().filter(|f| **f).count();
                if calls >= self.config.minimum_calls.max(1) {
                    let rate = failures as f64 / calls as f64;
                    if rate >= self.config.failure_rate_threshold {
                        tracing::warn!(
                            breaker = %self.name,
                            failures,
                            calls,
                            rate,
                            "failure rate threshold reached"
                        );
                        self.open(&mut shared);
                    }
                }
            }
            // Outcome of a call admitted under an earlier phase.
            _ => {}
        }
    }

    fn on_abandoned_trial(&self) {
        let mut shared = self.shared.lock();
        if let Phase::HalfOpen { trial_in_flight } = &mut shared.phase {
            *trial_in_flight = false;
        }
    }

    fn open(&self, shared: &mut Shared) {
        shared.window.clear();
        self.transition(
            shared,
            Phase::Open {
                opened_at: Instant::now(),
            },
        );
    }

    fn transition(&self, shared: &mut Shared, to: Phase) {
        let from = shared.phase.state();
        let to_state = to.state();
        shared.phase = to;

        if from != to_state {
            tracing::warn!(breaker = %self.name, %from, to = %to_state, "circuit breaker state changed");
            metrics::counter!(
                "circuit_breaker_transitions_total",
                "breaker" => self.name.clone(),
                "to" => to_state.as_str()
            )
            .increment(1);
        }
    }
}

/// Admission ticket for one call. Exactly one outcome is recorded per
/// permit; a trial permit dropped without an outcome frees the trial slot.
struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    recorded: bool,
}

impl Permit<'_> {
    fn record(mut self, failed: bool) {
        self.recorded = true;
        self.breaker.on_outcome(self.trial, failed);
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if !self.recorded && self.trial {
            self.breaker.on_abandoned_trial();
        }
    }
}
