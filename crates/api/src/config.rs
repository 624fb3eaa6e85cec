//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use resilience::{CircuitBreakerConfig, RetryConfig};

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `DATABASE_URL` — PostgreSQL URL; unset keeps bookings in memory
/// - `ALLOCATION_SERVICE_URL` — allocation service base URL
///   (default: `"http://localhost:8081"`)
/// - `ALLOCATION_TIMEOUT_MS` — per-request timeout (default: `5000`)
/// - `RETRY_MAX_ATTEMPTS` (default: `3`), `RETRY_BASE_DELAY_MS` (default: `1000`)
/// - `BREAKER_FAILURE_RATE` (default: `0.5`), `BREAKER_WINDOW_SIZE` (default: `10`),
///   `BREAKER_MINIMUM_CALLS` (default: `5`), `BREAKER_COOLDOWN_MS` (default: `30000`)
/// - `BOOKING_TIMEOUT_MS` — budget for one booking request (default: `30000`)
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database_url: Option<String>,
    pub allocation_service_url: String,
    pub allocation_timeout: Duration,
    pub retry: RetryConfig,
    pub breaker: CircuitBreakerConfig,
    pub booking_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed_or(&lookup, "PORT", defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            allocation_service_url: lookup("ALLOCATION_SERVICE_URL")
                .unwrap_or(defaults.allocation_service_url),
            allocation_timeout: millis("ALLOCATION_TIMEOUT_MS", defaults.allocation_timeout),
            retry: RetryConfig {
                max_attempts: parsed_or(
                    &lookup,
                    "RETRY_MAX_ATTEMPTS",
                    defaults.retry.max_attempts,
                ),
                base_delay: millis("RETRY_BASE_DELAY_MS", defaults.retry.base_delay),
                max_delay: defaults.retry.max_delay,
            },
            breaker: CircuitBreakerConfig {
                failure_rate_threshold: parsed_or(
                    &lookup,
                    "BREAKER_FAILURE_RATE",
                    defaults.breaker.failure_rate_threshold,
                ),
                window_size: parsed_or(
                    &lookup,
                    "BREAKER_WINDOW_SIZE",
                    defaults.breaker.window_size,
                ),
                minimum_calls: parsed_or(
                    &lookup,
                    "BREAKER_MINIMUM_CALLS",
                    defaults.breaker.minimum_calls,
                ),
                cooldown: millis("BREAKER_COOLDOWN_MS", defaults.breaker.cooldown),
            },
            booking_timeout: millis("BOOKING_TIMEOUT_MS", defaults.booking_timeout),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parsed_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database_url: None,
            allocation_service_url: "http://localhost:8081".to_string(),
            allocation_timeout: Duration::from_millis(5000),
            retry: RetryConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            booking_timeout: Duration::from_millis(30_000),
        }
    }
}
