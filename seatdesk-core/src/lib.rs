pub mod cancellation;
pub mod clock;
pub mod models;
pub mod overlap;
pub mod repository;

pub use cancellation::CancellationPolicy;
pub use clock::{Clock, FixedClock, SystemClock};
pub use models::{
    HourRange, NewReservation, Reservation, ReservationDetail, ReservationStatus, Seat,
    SeatAvailability, SeatStatus,
};
pub use overlap::overlaps;
pub use repository::{ReservationLedger, SeatCatalog};

use chrono::NaiveDate;

/// Every way a booking engine call can fail.
///
/// Everything except `StorageUnavailable` is an expected outcome that the
/// caller maps to a client-facing response. `StorageUnavailable` is surfaced
/// as-is; the engine never retries on its own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BookingError {
    #[error("Invalid hour range: [{start}, {end})")]
    InvalidRange { start: i32, end: i32 },

    #[error("Seat {seat_id} is already booked on {date} within [{start}, {end})")]
    SeatConflict {
        seat_id: i32,
        date: NaiveDate,
        start: i32,
        end: i32,
    },

    #[error("User {0} already holds an active reservation")]
    ActiveReservationExists(String),

    #[error("Reservation not found: {0}")]
    NotFound(i64),

    #[error("Reservation {0} belongs to another user")]
    Forbidden(i64),

    #[error("Reservation {0} is already canceled")]
    AlreadyCanceled(i64),

    #[error("Reservation {0} has already ended")]
    AlreadyEnded(i64),

    #[error("Seat not found: {0}")]
    UnknownSeat(i32),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

pub type BookingResult<T> = Result<T, BookingError>;
