//! Booking status state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// The persisted status of a booking.
///
/// State transitions:
/// ```text
/// (new) ──► Pending ──┬──► Confirmed
///                     └──► Cancelled
/// ```
///
/// A booking may also be written as `Cancelled` directly when allocation
/// never succeeded. Statuses never move backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    /// A room is held and awaiting confirmation.
    #[default]
    Pending,

    /// The room hold was confirmed (terminal state).
    Confirmed,

    /// The booking failed or was compensated (terminal state).
    Cancelled,
}

impl BookingStatus {
    /// Returns true if a booking in this status can be confirmed.
    pub fn can_confirm(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Returns true if a booking in this status can be cancelled.
    pub fn can_cancel(&self) -> bool {
        matches!(self, BookingStatus::Pending)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::Cancelled)
    }

    /// Returns true if moving from `self` to `next` keeps the status monotonic.
    ///
    /// Rewriting the same status is allowed.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        *self == next
            || match next {
                BookingStatus::Pending => false,
                BookingStatus::Confirmed => self.can_confirm(),
                BookingStatus::Cancelled => self.can_cancel(),
            }
    }

    /// Returns the status name as stored and serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(DomainError::UnknownStatus(other.to_string())),
        }
    }
}
