//! Resilience error types.

use thiserror::Error;

/// Classifies failures of a wrapped call.
///
/// Transient failures (network errors, timeouts, 5xx answers) are retried
/// and count against a circuit breaker. Anything else is a definite answer
/// from the dependency and is passed through untouched.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Outcome of a call made through a retry policy or circuit breaker.
#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The breaker rejected the call without contacting the dependency.
    #[error("Circuit breaker '{breaker}' is open")]
    CircuitOpen { breaker: String },

    /// Every permitted attempt failed with a transient error.
    #[error("Gave up after {attempts} attempt(s): {last}")]
    Exhausted { attempts: u32, last: E },

    /// The caller cancelled while an attempt or a backoff wait was in flight.
    #[error("Cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32, last: Option<E> },

    /// The wrapped call failed and the failure was not retried.
    #[error("{0}")]
    Inner(E),
}

impl<E> ResilienceError<E> {
    /// Returns true if the breaker short-circuited the call.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// Returns true if the caller cancelled the call.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ResilienceError::Cancelled { .. })
    }
}
