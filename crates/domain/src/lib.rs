//! Domain layer of the booking service.
//!
//! Holds the booking record, its forward-only status state machine and the
//! inbound request shape. Nothing here talks to a store or the network.

pub mod booking;
pub mod error;

pub use booking::{Booking, BookingRequest, BookingStatus, NewBooking};
pub use error::DomainError;
