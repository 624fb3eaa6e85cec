//! HTTP API server for the room booking saga.
//!
//! Exposes booking creation and lookup over REST, with structured logging
//! (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use allocation::AllocationClient;
use axum::Router;
use axum::routing::{get, post};
use booking_store::BookingStore;
use metrics_exporter_prometheus::PrometheusHandle;
use resilience::{CircuitBreaker, RetryPolicy};
use saga::BookingOrchestrator;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::bookings::AppState;

/// Name of the breaker guarding the allocation service.
pub const ALLOCATION_BREAKER: &str = "allocation-service";

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S, A>(state: Arc<AppState<S, A>>, metrics_handle: PrometheusHandle) -> Router
where
    S: BookingStore + 'static,
    A: AllocationClient + 'static,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S, A>))
        .route("/bookings", post(routes::bookings::create::<S, A>))
        .route("/bookings/{id}", get(routes::bookings::get::<S, A>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the orchestrator and its resilience policies from `config`.
pub fn create_state<S, A>(store: S, allocation: A, config: &Config) -> Arc<AppState<S, A>>
where
    S: BookingStore,
    A: AllocationClient,
{
    let breaker = Arc::new(CircuitBreaker::new(
        ALLOCATION_BREAKER,
        config.breaker.clone(),
    ));
    let retry = RetryPolicy::new(config.retry.clone());

    Arc::new(AppState {
        orchestrator: BookingOrchestrator::new(store, allocation, breaker, retry),
        booking_timeout: config.booking_timeout,
    })
}
