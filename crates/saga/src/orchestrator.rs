//! Booking orchestrator driving the allocate/confirm/compensate saga.

use std::sync::Arc;
use std::time::Instant;

use allocation::{AllocationClient, AllocationError};
use booking_store::{BookingStore, StoreError};
use common::{BookingId, CorrelationId, RoomId, UserId};
use domain::{Booking, BookingRequest, NewBooking};
use resilience::{CircuitBreaker, ResilienceError, RetryPolicy};
use tokio_util::sync::CancellationToken;

use crate::error::{BookingError, Result};

/// Runs booking requests as sagas against the allocation service.
///
/// Every request is keyed by its correlation id. A key that already has a
/// booking is answered from the store without touching the allocation
/// service, whatever the stored status is.
///
/// The breaker is shared by every request talking to the same allocation
/// service; pass the same `Arc` to every orchestrator built for it.
pub struct BookingOrchestrator<S, A>
where
    S: BookingStore,
    A: AllocationClient,
{
    store: S,
    allocation: A,
    breaker: Arc<CircuitBreaker>,
    retry: RetryPolicy,
}

impl<S, A> BookingOrchestrator<S, A>
where
    S: BookingStore,
    A: AllocationClient,
{
    /// Creates a new orchestrator.
    pub fn new(store: S, allocation: A, breaker: Arc<CircuitBreaker>, retry: RetryPolicy) -> Self {
        Self {
            store,
            allocation,
            breaker,
            retry,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Creates a booking for `user_id`, or returns the one already recorded
    /// under the request's correlation id.
    ///
    /// Remote failures are absorbed: the booking comes back CANCELLED.
    /// Only a store failure or `cancel` firing produce an error. A request
    /// cancelled after its PENDING record was written leaves that record
    /// for reconciliation.
    #[tracing::instrument(
        skip(self, request, cancel),
        fields(user_id = %user_id, correlation_id = tracing::field::Empty)
    )]
    pub async fn create_booking(
        &self,
        request: BookingRequest,
        user_id: UserId,
        cancel: &CancellationToken,
    ) -> Result<Booking> {
        metrics::counter!("booking_requests_total").increment(1);
        let started = Instant::now();

        let correlation_id = CorrelationId::from_request(request.correlation_id.as_deref());
        tracing::Span::current().record("correlation_id", tracing::field::display(&correlation_id));

        let result = self
            .run_saga(&request, user_id, correlation_id, cancel)
            .await;

        metrics::histogram!("booking_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(booking) => {
                metrics::counter!("booking_outcomes_total", "status" => booking.status.as_str())
                    .increment(1);
                tracing::info!(
                    booking_id = %booking.id,
                    status = %booking.status,
                    "booking request finished"
                );
            }
            Err(e) => tracing::warn!(error = %e, "booking request failed"),
        }
        result
    }

    /// Looks up a booking by id.
    #[tracing::instrument(skip(self))]
    pub async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.store.find_by_id(id).await?)
    }

    async fn run_saga(
        &self,
        request: &BookingRequest,
        user_id: UserId,
        correlation_id: CorrelationId,
        cancel: &CancellationToken,
    ) -> Result<Booking> {
        if let Some(existing) = self.store.find_by_correlation_id(&correlation_id).await? {
            metrics::counter!("booking_idempotent_replays_total").increment(1);
            tracing::info!(
                booking_id = %existing.id,
                status = %existing.status,
                "correlation id already booked, replaying"
            );
            return Ok(existing);
        }

        // Step 1: allocate
        let room_id = match self.allocate(cancel).await {
            Ok(Some(room_id)) => room_id,
            Ok(None) => {
                tracing::info!("no room available");
                return self
                    .record_unallocated(request, user_id, correlation_id)
                    .await;
            }
            Err(e) if e.is_cancelled() => return Err(BookingError::Cancelled),
            Err(e) => {
                tracing::warn!(error = %e, "room allocation failed");
                return self
                    .record_unallocated(request, user_id, correlation_id)
                    .await;
            }
        };
        tracing::info!(room_id = %room_id, "room allocated");

        // Step 2: persist PENDING before any confirmation attempt
        let pending = NewBooking::pending(request, user_id, room_id, correlation_id.clone());
        let mut booking = match self.store.insert(pending).await {
            Ok(booking) => booking,
            Err(StoreError::DuplicateCorrelationId(_)) => {
                tracing::info!(room_id = %room_id, "lost correlation id race, releasing room");
                self.compensate(room_id).await;
                return self.winner(&correlation_id).await;
            }
            Err(e) => {
                self.compensate(room_id).await;
                return Err(e.into());
            }
        };

        // Step 3: confirm, or release and cancel
        match self.confirm(room_id, cancel).await {
            Ok(()) => booking.confirm()?,
            Err(e) if e.is_cancelled() => {
                tracing::warn!(
                    booking_id = %booking.id,
                    room_id = %room_id,
                    "cancelled during confirmation, booking left PENDING"
                );
                return Err(BookingError::Cancelled);
            }
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "room confirmation failed");
                self.compensate(room_id).await;
                booking.cancel()?;
            }
        }

        Ok(self.store.update(&booking).await?)
    }

    async fn allocate(
        &self,
        cancel: &CancellationToken,
    ) -> std::result::Result<Option<RoomId>, ResilienceError<AllocationError>> {
        let breaker = &self.breaker;
        let allocation = &self.allocation;
        self.retry
            .execute("allocate", cancel, move |_| {
                breaker.call(move || allocation.allocate())
            })
            .await
    }

    async fn confirm(
        &self,
        room_id: RoomId,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), ResilienceError<AllocationError>> {
        let breaker = &self.breaker;
        let allocation = &self.allocation;
        self.retry
            .execute("confirm", cancel, move |_| {
                breaker.call(move || allocation.confirm(room_id))
            })
            .await
    }

    /// Releases `room_id` with a single attempt. Failures are only logged.
    ///
    /// The release goes straight to the allocation service. It must still be
    /// sent when the failures that led here have opened the breaker.
    async fn compensate(&self, room_id: RoomId) {
        match self.allocation.release(room_id).await {
            Ok(()) => tracing::info!(room_id = %room_id, "room released"),
            Err(e) => {
                metrics::counter!("booking_compensation_failures_total").increment(1);
                tracing::error!(room_id = %room_id, error = %e, "room release failed");
            }
        }
    }

    async fn record_unallocated(
        &self,
        request: &BookingRequest,
        user_id: UserId,
        correlation_id: CorrelationId,
    ) -> Result<Booking> {
        let booking = NewBooking::unallocated(request, user_id, correlation_id.clone());
        match self.store.insert(booking).await {
            Ok(booking) => Ok(booking),
            Err(StoreError::DuplicateCorrelationId(_)) => self.winner(&correlation_id).await,
            Err(e) => Err(e.into()),
        }
    }

    /// Reads the booking of whoever won an insert race on `correlation_id`.
    async fn winner(&self, correlation_id: &CorrelationId) -> Result<Booking> {
        self.store
            .find_by_correlation_id(correlation_id)
            .await?
            .ok_or_else(|| StoreError::DuplicateCorrelationId(correlation_id.clone()).into())
    }
}
