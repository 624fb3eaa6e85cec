//! Resilience policies for calls to remote dependencies.
//!
//! Both policies wrap a single call and compose by nesting:
//!
//! ```text
//! retry.execute(op, cancel, |_| breaker.call(|| client.confirm(room)))
//! ```
//!
//! The breaker sits inside the retry loop, so every attempt is admitted (or
//! rejected) individually and an open circuit ends the retry loop at once.

pub mod circuit_breaker;
pub mod error;
pub mod retry;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use error::{ResilienceError, Transient};
pub use retry::{RetryConfig, RetryPolicy};
