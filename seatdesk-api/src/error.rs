use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use seatdesk_core::BookingError;

/// Engine errors on their way out to an HTTP client.
#[derive(Debug)]
pub struct AppError(pub BookingError);

impl AppError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            BookingError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
            BookingError::Forbidden(_) => StatusCode::FORBIDDEN,
            BookingError::NotFound(_) | BookingError::UnknownSeat(_) => StatusCode::NOT_FOUND,
            BookingError::SeatConflict { .. }
            | BookingError::ActiveReservationExists(_)
            | BookingError::AlreadyCanceled(_)
            | BookingError::AlreadyEnded(_) => StatusCode::CONFLICT,
            BookingError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match &self.0 {
            BookingError::InvalidRange { .. } => "INVALID_RANGE",
            BookingError::SeatConflict { .. } => "SEAT_CONFLICT",
            BookingError::ActiveReservationExists(_) => "ACTIVE_RESERVATION_EXISTS",
            BookingError::NotFound(_) => "NOT_FOUND",
            BookingError::Forbidden(_) => "FORBIDDEN",
            BookingError::AlreadyCanceled(_) => "ALREADY_CANCELED",
            BookingError::AlreadyEnded(_) => "ALREADY_ENDED",
            BookingError::UnknownSeat(_) => "UNKNOWN_SEAT",
            BookingError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self.0 {
            BookingError::StorageUnavailable(msg) => {
                tracing::error!("Storage unavailable: {}", msg);
                "Storage unavailable".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.code(),
                "message": message,
            },
        }));

        (status, body).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        Self(err)
    }
}
