//! Allocation client error types.

use resilience::Transient;
use thiserror::Error;

/// Failures of a single round trip to the allocation service.
///
/// "No rooms available" is not an error; `allocate` reports it as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Transport error, timeout, or a 5xx answer.
    #[error("Allocation service unavailable: {0}")]
    RemoteUnavailable(String),

    /// The service answered with a 4xx status.
    #[error("Allocation service rejected {operation}: HTTP {status}")]
    Rejected { operation: &'static str, status: u16 },

    /// The service answered 2xx with a body that could not be understood.
    #[error("Invalid response from allocation service: {0}")]
    InvalidResponse(String),
}

impl Transient for AllocationError {
    fn is_transient(&self) -> bool {
        matches!(self, AllocationError::RemoteUnavailable(_))
    }
}
