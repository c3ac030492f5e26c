use chrono::NaiveDateTime;

use crate::models::Reservation;
use crate::{BookingError, BookingResult};

/// Decides whether a committed reservation may move to `CANCELED`.
pub struct CancellationPolicy;

impl CancellationPolicy {
    /// Confirmed and ending strictly after `now`.
    pub fn is_cancelable(reservation: &Reservation, now: NaiveDateTime) -> bool {
        reservation.is_active_at(now)
    }

    /// Full eligibility check for `requesting_user`, in the order ownership,
    /// status, then elapsed time.
    pub fn check(
        reservation: &Reservation,
        requesting_user: &str,
        now: NaiveDateTime,
    ) -> BookingResult<()> {
        if reservation.user_id != requesting_user {
            return Err(BookingError::Forbidden(reservation.resv_no));
        }

        if !reservation.is_confirmed() {
            return Err(BookingError::AlreadyCanceled(reservation.resv_no));
        }

        if !Self::is_cancelable(reservation, now) {
            return Err(BookingError::AlreadyEnded(reservation.resv_no));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReservationStatus;
    use chrono::Utc;

    fn reservation() -> Reservation {
        Reservation {
            resv_no: 7,
            user_id: "alice".to_string(),
            seat_id: 5,
            date: "2024-01-01".parse().unwrap(),
            start_hour: 9,
            end_hour: 12,
            total_price: 5000,
            status: ReservationStatus::Confirmed,
            created_at: Utc::now(),
        }
    }

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn test_cancelable_until_end_instant() {
        let r = reservation();
        assert!(CancellationPolicy::is_cancelable(&r, at("2023-12-31T23:00:00")));
        assert!(CancellationPolicy::is_cancelable(&r, at("2024-01-01T10:30:00")));
        assert!(!CancellationPolicy::is_cancelable(&r, at("2024-01-01T12:00:00")));
        assert!(!CancellationPolicy::is_cancelable(&r, at("2024-01-02T08:00:00")));
    }

    #[test]
    fn test_check_order() {
        let mut r = reservation();
        let now = at("2024-01-01T13:00:00");

        // Another user's ended, canceled reservation still reports ownership first.
        r.status = ReservationStatus::Canceled;
        assert_eq!(
            CancellationPolicy::check(&r, "bob", now),
            Err(BookingError::Forbidden(7))
        );
        assert_eq!(
            CancellationPolicy::check(&r, "alice", now),
            Err(BookingError::AlreadyCanceled(7))
        );

        r.status = ReservationStatus::Confirmed;
        assert_eq!(
            CancellationPolicy::check(&r, "alice", now),
            Err(BookingError::AlreadyEnded(7))
        );
        assert_eq!(
            CancellationPolicy::check(&r, "alice", at("2024-01-01T08:00:00")),
            Ok(())
        );
    }
}
