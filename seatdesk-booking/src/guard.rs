use std::sync::Arc;
use tracing::{info, warn};

use seatdesk_core::{
    BookingError, BookingResult, Clock, NewReservation, Reservation, ReservationLedger,
    SeatCatalog,
};

/// Front door for booking requests.
///
/// The checks here only exist to fail fast with a specific error. They can
/// race; the ledger repeats them inside its atomic commit and is the only
/// source of truth.
pub struct ReservationGuard {
    catalog: Arc<dyn SeatCatalog>,
    ledger: Arc<dyn ReservationLedger>,
    clock: Arc<dyn Clock>,
}

impl ReservationGuard {
    pub fn new(
        catalog: Arc<dyn SeatCatalog>,
        ledger: Arc<dyn ReservationLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            ledger,
            clock,
        }
    }

    pub async fn book(&self, request: NewReservation) -> BookingResult<Reservation> {
        // 1. Hour bounds
        let hours = request.hours()?;

        // 2. Seat must exist
        if self.catalog.get_seat(request.seat_id).await?.is_none() {
            return Err(BookingError::UnknownSeat(request.seat_id));
        }

        // 3. One active reservation per user
        let now = self.clock.now();
        if !self
            .ledger
            .active_for_user(&request.user_id, now)
            .await?
            .is_empty()
        {
            warn!("User {} already holds an active reservation", request.user_id);
            return Err(BookingError::ActiveReservationExists(request.user_id));
        }

        // 4. No overlap on the seat
        let taken = self
            .ledger
            .confirmed_on(request.date)
            .await?
            .iter()
            .any(|r| r.blocks(request.seat_id, request.date, &hours));
        if taken {
            warn!(
                "Seat {} already booked on {} within [{}, {})",
                request.seat_id, request.date, hours.start, hours.end
            );
            return Err(BookingError::SeatConflict {
                seat_id: request.seat_id,
                date: request.date,
                start: hours.start,
                end: hours.end,
            });
        }

        // 5. Authoritative commit
        let reservation = self.ledger.commit(&request).await?;
        info!(
            "User {} booked seat {} on {} [{}, {}) as #{}",
            reservation.user_id,
            reservation.seat_id,
            reservation.date,
            reservation.start_hour,
            reservation.end_hour,
            reservation.resv_no
        );
        Ok(reservation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryLedger, InMemorySeatCatalog};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use seatdesk_core::{FixedClock, ReservationStatus, Seat};

    fn seats() -> Arc<InMemorySeatCatalog> {
        Arc::new(InMemorySeatCatalog::new((1..=10).map(|id| Seat {
            seat_id: id,
            type_id: 1,
            capacity: 1,
            location: String::new(),
            notes: String::new(),
        })))
    }

    fn request(user: &str, seat: i32, start: i32, end: i32) -> NewReservation {
        NewReservation {
            user_id: user.to_string(),
            seat_id: seat,
            date: "2024-01-01".parse().unwrap(),
            start_hour: start,
            end_hour: end,
            total_price: 5000,
        }
    }

    fn guard() -> ReservationGuard {
        let clock = Arc::new(FixedClock::new("2023-12-31T12:00:00".parse().unwrap()));
        let catalog = seats();
        let ledger = Arc::new(InMemoryLedger::new(catalog.clone(), clock.clone()));
        ReservationGuard::new(catalog, ledger, clock)
    }

    #[tokio::test]
    async fn test_book_success() {
        let r = guard().book(request("alice", 5, 9, 12)).await.unwrap();
        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.total_price, 5000);
    }

    #[tokio::test]
    async fn test_rejections() {
        let guard = guard();
        guard.book(request("alice", 5, 9, 12)).await.unwrap();

        assert_eq!(
            guard.book(request("carol", 5, 0, 25)).await.unwrap_err(),
            BookingError::InvalidRange { start: 0, end: 25 }
        );
        assert_eq!(
            guard.book(request("carol", 42, 9, 12)).await.unwrap_err(),
            BookingError::UnknownSeat(42)
        );
        assert_eq!(
            guard.book(request("alice", 7, 14, 16)).await.unwrap_err(),
            BookingError::ActiveReservationExists("alice".to_string())
        );
        assert!(matches!(
            guard.book(request("bob", 5, 10, 11)).await.unwrap_err(),
            BookingError::SeatConflict { seat_id: 5, start: 10, end: 11, .. }
        ));
    }

    /// Ledger whose reads see nothing, so only `commit` can catch conflicts.
    struct BlindReads(InMemoryLedger);

    #[async_trait]
    impl ReservationLedger for BlindReads {
        async fn commit(&self, request: &NewReservation) -> BookingResult<Reservation> {
            self.0.commit(request).await
        }
        async fn cancel(&self, resv_no: i64, user: &str) -> BookingResult<Reservation> {
            self.0.cancel(resv_no, user).await
        }
        async fn list_by_user(&self, user_id: &str) -> BookingResult<Vec<Reservation>> {
            self.0.list_by_user(user_id).await
        }
        async fn get(&self, resv_no: i64) -> BookingResult<Option<Reservation>> {
            self.0.get(resv_no).await
        }
        async fn confirmed_on(&self, _date: NaiveDate) -> BookingResult<Vec<Reservation>> {
            Ok(vec![])
        }
        async fn active_for_user(
            &self,
            _user_id: &str,
            _now: NaiveDateTime,
        ) -> BookingResult<Vec<Reservation>> {
            Ok(vec![])
        }
    }

    #[tokio::test]
    async fn test_commit_catches_stale_pre_checks() {
        let clock = Arc::new(FixedClock::new("2023-12-31T12:00:00".parse().unwrap()));
        let catalog = seats();
        let ledger = Arc::new(BlindReads(InMemoryLedger::new(catalog.clone(), clock.clone())));
        let guard = ReservationGuard::new(catalog, ledger, clock);

        guard.book(request("alice", 5, 9, 12)).await.unwrap();
        assert!(matches!(
            guard.book(request("bob", 5, 10, 11)).await.unwrap_err(),
            BookingError::SeatConflict { .. }
        ));
        assert_eq!(
            guard.book(request("alice", 6, 14, 16)).await.unwrap_err(),
            BookingError::ActiveReservationExists("alice".to_string())
        );
    }
}
