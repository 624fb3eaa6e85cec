use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, CorrelationId};
use domain::{Booking, NewBooking};

use crate::Result;

/// Durable keyed storage for bookings.
///
/// The store persists exactly what it is given. It never decides a status on
/// its own; it only guarantees single-record atomicity and the uniqueness of
/// `correlation_id`. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Looks a booking up by its idempotency key.
    async fn find_by_correlation_id(
        &self,
        correlation_id: &CorrelationId,
    ) -> Result<Option<Booking>>;

    /// Looks a booking up by its store-assigned identity.
    async fn find_by_id(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Persists a booking for the first time, assigning `id` and `created_at`.
    ///
    /// Fails with `DuplicateCorrelationId` if a booking with the same key
    /// already exists; the existing record is left untouched.
    async fn insert(&self, booking: NewBooking) -> Result<Booking>;

    /// Persists the mutable fields (`status`, `room_id`) of an existing booking.
    ///
    /// Fails with `NotFound` if no booking has this id. `id`, `created_at`
    /// and `correlation_id` are never rewritten.
    async fn update(&self, booking: &Booking) -> Result<Booking>;

    /// Returns PENDING bookings created strictly before `cutoff`, oldest first.
    ///
    /// Used by reconciliation to find sagas that were interrupted between the
    /// PENDING write and their terminal write.
    async fn find_pending_older_than(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;
}
