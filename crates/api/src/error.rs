//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use saga::BookingError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// No authenticated principal on the request.
    Unauthorized(String),
    /// Booking saga error.
    Booking(BookingError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Booking(err) => booking_error_to_response(err),
        };

        let body = serde_json::json!({ "error": message });
        (status, axum::Json(body)).into_response()
    }
}

fn booking_error_to_response(err: BookingError) -> (StatusCode, String) {
    match &err {
        BookingError::StoreUnavailable(_) => {
            tracing::error!(error = %err, "booking store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
        BookingError::Cancelled => (StatusCode::GATEWAY_TIMEOUT, err.to_string()),
        BookingError::Domain(_) => {
            tracing::error!(error = %err, "booking state transition rejected");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(err: BookingError) -> Self {
        ApiError::Booking(err)
    }
}
