//! Client side of the remote room allocation service.
//!
//! [`AllocationClient`] is the three-operation protocol (allocate, confirm,
//! release). [`HttpAllocationClient`] speaks it over HTTP and
//! [`InMemoryAllocationService`] is a scriptable stand-in for tests.

pub mod client;
pub mod error;
pub mod http;
pub mod memory;

pub use client::AllocationClient;
pub use error::AllocationError;
pub use http::HttpAllocationClient;
pub use memory::InMemoryAllocationService;
