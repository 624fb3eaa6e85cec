//! Booking records.

use chrono::{DateTime, NaiveDate, Utc};
use common::{BookingId, CorrelationId, RoomId, UserId};
use serde::{Deserialize, Serialize};

use super::request::BookingRequest;
use super::state::BookingStatus;
use crate::error::DomainError;

/// A booking that has not been persisted yet.
///
/// The store turns it into a [`Booking`] by assigning `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub user_id: UserId,
    pub room_id: Option<RoomId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub correlation_id: CorrelationId,
}

impl NewBooking {
    /// A booking that holds `room_id` and waits for confirmation.
    pub fn pending(
        request: &BookingRequest,
        user_id: UserId,
        room_id: RoomId,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            user_id,
            room_id: Some(room_id),
            start_date: request.start_date,
            end_date: request.end_date,
            status: BookingStatus::Pending,
            correlation_id,
        }
    }

    /// A booking that never obtained a room.
    pub fn unallocated(
        request: &BookingRequest,
        user_id: UserId,
        correlation_id: CorrelationId,
    ) -> Self {
        Self {
            user_id,
            room_id: None,
            start_date: request.start_date,
            end_date: request.end_date,
            status: BookingStatus::Cancelled,
            correlation_id,
        }
    }

    /// Attaches the store-assigned identity.
    pub fn into_booking(self, id: BookingId, created_at: DateTime<Utc>) -> Booking {
        Booking {
            id,
            user_id: self.user_id,
            room_id: self.room_id,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            created_at,
            correlation_id: self.correlation_id,
        }
    }
}

/// A persisted booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub room_id: Option<RoomId>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub correlation_id: CorrelationId,
}

impl Booking {
    /// Marks the held room as confirmed.
    pub fn confirm(&mut self) -> Result<(), DomainError> {
        self.transition(BookingStatus::Confirmed)
    }

    /// Marks the booking as cancelled. The room id, if any, is kept.
    pub fn cancel(&mut self) -> Result<(), DomainError> {
        self.transition(BookingStatus::Cancelled)
    }

    fn transition(&mut self, next: BookingStatus) -> Result<(), DomainError> {
        if self.status.is_terminal() || !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                booking_id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
