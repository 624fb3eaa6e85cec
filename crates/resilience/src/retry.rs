//! Bounded retry with exponential backoff.
//!
//! ```text
//! Attempt    Delay after failure (base=1s)
//! ─────────────────────────────────────────
//!    1                 1s
//!    2                 2s
//!    3          (no delay, give up)
//! ```
//!
//! Delays are awaited on the tokio timer, so a waiting retry only parks its
//! own task. Both the attempt and the wait race against the caller's
//! cancellation token.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{ResilienceError, Transient};

/// Default number of attempts, including the first one.
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default delay after the first failed attempt.
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound for a single delay.
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Retry policy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts, including the first one. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles after each further failure.
    pub base_delay: Duration,
    /// Upper bound for a single delay.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
        }
    }
}

/// Retries a single remote call on transient failures.
#[derive(Debug, Clone, Default)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    /// Creates a policy from the given settings.
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// Returns the number of attempts the policy will make at most.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.config
            .base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.config.max_delay)
            .min(self.config.max_delay)
    }

    /// Runs `op` until it succeeds, fails permanently, exhausts the attempt
    /// budget, or `cancel` fires.
    ///
    /// `op` receives the 1-based attempt number. Only
    /// `ResilienceError::Inner` errors whose payload is transient are
    /// retried; an open circuit or a definite answer is returned at once.
    /// On cancellation the in-flight attempt is dropped and the last
    /// observed failure is surfaced in `ResilienceError::Cancelled`.
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: &'static str,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ResilienceError<E>>>,
        E: Transient + Display,
    {
        let max_attempts = self.max_attempts();
        let mut last: Option<E> = None;
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(ResilienceError::Cancelled {
                    attempts: attempt,
                    last,
                });
            }
            attempt += 1;

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(operation, attempt, "attempt aborted by cancellation");
                    return Err(ResilienceError::Cancelled { attempts: attempt, last });
                }
                outcome = op(attempt) => outcome,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(operation, attempt, "call succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(ResilienceError::Inner(e)) if e.is_transient() => e,
                Err(other) => return Err(other),
            };

            if attempt >= max_attempts {
                tracing::warn!(operation, attempts = attempt, error = %err, "retries exhausted");
                return Err(ResilienceError::Exhausted {
                    attempts: attempt,
                    last: err,
                });
            }

            let delay = self.delay_for(attempt);
            tracing::warn!(
                operation,
                attempt,
                max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, backing off"
            );
            metrics::counter!("retry_backoffs_total", "operation" => operation).increment(1);
            last = Some(err);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!(operation, attempt, "backoff interrupted by cancellation");
                    return Err(ResilienceError::Cancelled { attempts: attempt, last });
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use parking_lot::Mutex;
    use tokio::time::Instant;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Flaky,
        Fatal,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{self:?}")
        }
    }

    impl Transient for TestError {
        fn is_transient(&self) -> bool {
            matches!(self, TestError::Flaky)
        }
    }

    fn policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(RetryConfig {
            max_attempts,
            ..RetryConfig::default()
        })
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let policy = RetryPolicy::new(RetryConfig {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
        });
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(4), Duration::from_secs(5));
        assert_eq!(policy.delay_for(40), Duration::from_secs(5));
    }

    #[test]
    fn test_zero_attempts_still_tries_once() {
        assert_eq!(policy(0).max_attempts(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_on_first_attempt_does_not_sleep() {
        let start = Instant::now();
        let result: Result<u32, ResilienceError<TestError>> = policy(3)
            .execute("test", &CancellationToken::new(), |_| async { Ok(7) })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failure_attempts_exactly_max_with_doubling_delays() {
        let attempts_at = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        let seen = attempts_at.clone();
        let result: Result<(), _> = policy(3)
            .execute("test", &CancellationToken::new(), move |_| {
                seen.lock().push(start.elapsed());
                async { Err(ResilienceError::Inner(TestError::Flaky)) }
            })
            .await;

        assert!(matches!(
            result,
            Err(ResilienceError::Exhausted {
                attempts: 3,
                last: TestError::Flaky
            })
        ));
        let at = attempts_at.lock().clone();
        assert_eq!(
            at,
            vec![
                Duration::ZERO,
                Duration::from_secs(1),
                Duration::from_secs(3)
            ]
        );
        // No wait after the final attempt.
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result = policy(3)
            .execute("test", &CancellationToken::new(), move |attempt| {
                counter.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(ResilienceError::Inner(TestError::Flaky))
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_transient_failure_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<(), _> = policy(3)
            .execute("test", &CancellationToken::new(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(ResilienceError::Inner(TestError::Fatal)) }
            })
            .await;

        assert!(matches!(result, Err(ResilienceError::Inner(TestError::Fatal))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<(), ResilienceError<TestError>> = policy(3)
            .execute("test", &CancellationToken::new(), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ResilienceError::CircuitOpen {
                        breaker: "test".to_string(),
                    })
                }
            })
            .await;

        assert!(result.unwrap_err().is_circuit_open());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_surfaces_last_failure() {
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let counter = calls.clone();
        let start = Instant::now();
        let result: Result<(), _> = policy(3)
            .execute("test", &cancel, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err(ResilienceError::Inner(TestError::Flaky)) }
            })
            .await;

        assert!(matches!(
            result,
            Err(ResilienceError::Cancelled {
                attempts: 1,
                last: Some(TestError::Flaky)
            })
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_aborts_in_flight_attempt() {
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let result: Result<(), ResilienceError<TestError>> = policy(3)
            .execute("test", &cancel, |_| async {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            })
            .await;

        assert!(matches!(
            result,
            Err(ResilienceError::Cancelled {
                attempts: 1,
                last: None
            })
        ));
    }

    #[tokio::test]
    async fn test_already_cancelled_makes_no_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<(), ResilienceError<TestError>> = policy(3)
            .execute("test", &cancel, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await;

        assert!(result.unwrap_err().is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
