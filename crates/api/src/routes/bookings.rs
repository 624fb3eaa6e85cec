//! Booking endpoints.

use std::sync::Arc;
use std::time::Duration;

use allocation::AllocationClient;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use booking_store::BookingStore;
use common::{BookingId, UserId};
use domain::{Booking, BookingRequest};
use saga::BookingOrchestrator;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// Header carrying the principal resolved by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Shared application state accessible from all handlers.
pub struct AppState<S, A>
where
    S: BookingStore,
    A: AllocationClient,
{
    pub orchestrator: BookingOrchestrator<S, A>,
    /// Budget for one `POST /bookings`; the saga is cancelled once it runs out.
    pub booking_timeout: Duration,
}

// -- Handlers --

/// POST /bookings — run the booking saga for the calling user.
#[tracing::instrument(skip(state, headers, req))]
pub async fn create<S, A>(
    State(state): State<Arc<AppState<S, A>>>,
    headers: HeaderMap,
    Json(req): Json<BookingRequest>,
) -> Result<Json<Booking>, ApiError>
where
    S: BookingStore + 'static,
    A: AllocationClient + 'static,
{
    let user_id = user_id(&headers)?;
    if req.end_date < req.start_date {
        return Err(ApiError::BadRequest(format!(
            "end_date {} is before start_date {}",
            req.end_date, req.start_date
        )));
    }

    let cancel = CancellationToken::new();
    let deadline = {
        let cancel = cancel.clone();
        let timeout = state.booking_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "booking request timed out");
            cancel.cancel();
        })
    };

    let result = state
        .orchestrator
        .create_booking(req, user_id, &cancel)
        .await;
    deadline.abort();

    Ok(Json(result?))
}

/// GET /bookings/{id} — load a booking by ID.
#[tracing::instrument(skip(state))]
pub async fn get<S, A>(
    State(state): State<Arc<AppState<S, A>>>,
    Path(id): Path<i64>,
) -> Result<Json<Booking>, ApiError>
where
    S: BookingStore + 'static,
    A: AllocationClient + 'static,
{
    let booking = state
        .orchestrator
        .get_booking(BookingId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Booking {id} not found")))?;

    Ok(Json(booking))
}

fn user_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let value = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| ApiError::Unauthorized(format!("Missing {USER_ID_HEADER} header")))?;

    value
        .to_str()
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .map(UserId::new)
        .ok_or_else(|| ApiError::Unauthorized(format!("Invalid {USER_ID_HEADER} header")))
}
