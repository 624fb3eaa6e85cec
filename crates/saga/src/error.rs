//! Booking saga error types.

use booking_store::StoreError;
use domain::DomainError;
use thiserror::Error;

/// Errors surfaced by [`BookingOrchestrator`](crate::BookingOrchestrator).
///
/// Remote allocation failures never show up here; they end in a
/// CANCELLED booking instead.
#[derive(Debug, Error)]
pub enum BookingError {
    /// The booking store failed; the outcome of the request is unknown.
    #[error("Booking store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The caller gave up before the saga finished.
    #[error("Booking request cancelled")]
    Cancelled,

    /// A status transition was rejected.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

/// Convenience type alias for booking results.
pub type Result<T> = std::result::Result<T, BookingError>;
