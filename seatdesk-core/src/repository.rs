use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{NewReservation, Reservation, Seat};
use crate::BookingResult;

/// Read-only access to the seat catalog.
#[async_trait]
pub trait SeatCatalog: Send + Sync {
    /// All seats, ordered by seat id.
    async fn get_seats(&self) -> BookingResult<Vec<Seat>>;

    async fn get_seat(&self, seat_id: i32) -> BookingResult<Option<Seat>>;
}

/// The authoritative store of reservations and the only component allowed to
/// mutate them.
///
/// `commit` and `cancel` are each one indivisible unit with respect to every
/// other `commit`/`cancel` touching the same seat and date, the same user, or
/// the same reservation number. Implementations never retry.
#[async_trait]
pub trait ReservationLedger: Send + Sync {
    /// Allocates a fresh reservation number, re-validates seat overlap and the
    /// single-active-reservation rule against current state, and inserts a
    /// `CONFIRMED` record.
    async fn commit(&self, request: &NewReservation) -> BookingResult<Reservation>;

    /// Loads the reservation, applies `CancellationPolicy`, and flips it to
    /// `CANCELED`. Returns the record in its new state.
    async fn cancel(&self, resv_no: i64, requesting_user: &str) -> BookingResult<Reservation>;

    /// Newest first: `(date desc, start desc)`.
    async fn list_by_user(&self, user_id: &str) -> BookingResult<Vec<Reservation>>;

    async fn get(&self, resv_no: i64) -> BookingResult<Option<Reservation>>;

    /// Confirmed reservations on `date`, for every seat.
    async fn confirmed_on(&self, date: NaiveDate) -> BookingResult<Vec<Reservation>>;

    /// The user's confirmed reservations that have not yet ended at `now`.
    async fn active_for_user(
        &self,
        user_id: &str,
        now: NaiveDateTime,
    ) -> BookingResult<Vec<Reservation>>;
}
