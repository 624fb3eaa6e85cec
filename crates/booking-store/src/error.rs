use common::{BookingId, CorrelationId};
use domain::DomainError;
use thiserror::Error;

/// Errors that can occur when interacting with the booking store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another booking already owns this correlation id.
    ///
    /// Raised by `insert` when two writers race on the same idempotency key;
    /// the loser should re-read the winner's record.
    #[error("Booking with correlation id {0} already exists")]
    DuplicateCorrelationId(CorrelationId),

    /// No booking exists with the given id.
    #[error("Booking not found: {0}")]
    NotFound(BookingId),

    /// A stored row could not be mapped back into a booking.
    #[error("Corrupt booking row: {0}")]
    Corrupt(#[from] DomainError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// Returns true if the store itself could not be reached or failed,
    /// as opposed to a logical conflict the caller can resolve.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Database(_) | StoreError::Migration(_) | StoreError::Corrupt(_)
        )
    }
}

/// Result type for booking store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
