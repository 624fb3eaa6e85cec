//! Domain error types.

use common::BookingId;
use thiserror::Error;

use crate::booking::BookingStatus;

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A status change would move a booking backwards or out of a terminal state.
    #[error("Invalid transition for booking {booking_id}: {from} -> {to}")]
    InvalidTransition {
        booking_id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
    },

    /// A stored status string is not one of the known values.
    #[error("Unknown booking status: {0}")]
    UnknownStatus(String),
}
