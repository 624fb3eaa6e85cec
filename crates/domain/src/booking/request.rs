//! Inbound booking request.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What a caller asks for.
///
/// Dates are carried through unchanged; validating them is the caller's job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub correlation_id: Option<String>,
}

impl BookingRequest {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            correlation_id: None,
        }
    }

    /// Sets the idempotency key for this request.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_is_optional_on_the_wire() {
        let req: BookingRequest =
            serde_json::from_str(r#"{"start_date":"2026-11-01","end_date":"2026-11-03"}"#)
                .unwrap();
        assert!(req.correlation_id.is_none());

        let req: BookingRequest = serde_json::from_str(
            r#"{"start_date":"2026-11-01","end_date":"2026-11-03","correlation_id":"dup-1"}"#,
        )
        .unwrap();
        assert_eq!(req.correlation_id.as_deref(), Some("dup-1"));
    }
}
