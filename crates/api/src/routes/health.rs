//! Health check endpoint.

use std::sync::Arc;

use allocation::AllocationClient;
use axum::Json;
use axum::extract::State;
use booking_store::BookingStore;
use serde::Serialize;

use super::bookings::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// State of the breaker guarding the allocation service.
    pub allocation_circuit: &'static str,
}

/// GET /health — liveness plus the allocation breaker state.
///
/// An open breaker does not make the service unhealthy; bookings are still
/// answered (as CANCELLED).
pub async fn check<S, A>(State(state): State<Arc<AppState<S, A>>>) -> Json<HealthResponse>
where
    S: BookingStore + 'static,
    A: AllocationClient + 'static,
{
    Json(HealthResponse {
        status: "ok",
        allocation_circuit: state.orchestrator.breaker().state().as_str(),
    })
}
