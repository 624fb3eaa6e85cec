//! Identifier types shared by every crate of the booking service.

pub mod types;

pub use types::{BookingId, CorrelationId, RoomId, UserId};
