//! Booking record, status and request types.

mod entity;
mod request;
mod state;

pub use entity::{Booking, NewBooking};
pub use request::BookingRequest;
pub use state::BookingStatus;
