//! Booking saga.
//!
//! A booking request is carried out as a short saga against the remote
//! allocation service:
//! 1. Allocate a room
//! 2. Persist the booking as PENDING
//! 3. Confirm the room
//!
//! If confirmation fails the room is released (compensation) and the booking
//! ends CANCELLED. Remote calls go through a shared circuit breaker and a
//! bounded retry policy.

pub mod error;
pub mod orchestrator;

pub use error::{BookingError, Result};
pub use orchestrator::BookingOrchestrator;
