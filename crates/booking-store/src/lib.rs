//! Booking persistence.
//!
//! The [`BookingStore`] trait is the only contract the orchestrator relies
//! on: lookups by id and by correlation id, a uniqueness-enforcing insert and
//! a single-record update.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryBookingStore;
pub use postgres::PostgresBookingStore;
pub use store::BookingStore;
