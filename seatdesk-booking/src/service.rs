use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use seatdesk_core::{
    BookingResult, Clock, NewReservation, Reservation, ReservationDetail, ReservationLedger,
    Seat, SeatAvailability, SeatCatalog, SeatStatus,
};

use crate::availability::AvailabilityResolver;
use crate::guard::ReservationGuard;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ActiveSummary {
    pub has_active_reservation: bool,
    pub active_count: usize,
}

/// Wires the guard, resolver and ledger over one shared catalog, ledger and
/// clock. This is the in-process surface the HTTP layer calls.
pub struct BookingService {
    guard: ReservationGuard,
    resolver: AvailabilityResolver,
    catalog: Arc<dyn SeatCatalog>,
    ledger: Arc<dyn ReservationLedger>,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(
        catalog: Arc<dyn SeatCatalog>,
        ledger: Arc<dyn ReservationLedger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            guard: ReservationGuard::new(catalog.clone(), ledger.clone(), clock.clone()),
            resolver: AvailabilityResolver::new(catalog.clone(), ledger.clone()),
            catalog,
            ledger,
            clock,
        }
    }

    pub async fn book(&self, request: NewReservation) -> BookingResult<Reservation> {
        self.guard.book(request).await
    }

    pub async fn cancel(&self, resv_no: i64, user_id: &str) -> BookingResult<Reservation> {
        self.ledger.cancel(resv_no, user_id).await
    }

    /// The user's history, newest first, each row carrying its seat.
    pub async fn my_reservations(&self, user_id: &str) -> BookingResult<Vec<ReservationDetail>> {
        let reservations = self.ledger.list_by_user(user_id).await?;
        let seats: BTreeMap<i32, Seat> = self
            .catalog
            .get_seats()
            .await?
            .into_iter()
            .map(|s| (s.seat_id, s))
            .collect();

        Ok(reservations
            .into_iter()
            .map(|reservation| ReservationDetail {
                seat: seats.get(&reservation.seat_id).cloned(),
                reservation,
            })
            .collect())
    }

    pub async fn availability(
        &self,
        date: NaiveDate,
        start_hour: i32,
        end_hour: i32,
    ) -> BookingResult<Vec<SeatAvailability>> {
        self.resolver.resolve_seats(date, start_hour, end_hour).await
    }

    pub async fn occupancy(
        &self,
        date: NaiveDate,
        start_hour: i32,
        end_hour: i32,
    ) -> BookingResult<BTreeMap<i32, SeatStatus>> {
        self.resolver.resolve(date, start_hour, end_hour).await
    }

    pub async fn active_reservation(&self, user_id: &str) -> BookingResult<ActiveSummary> {
        let active = self
            .ledger
            .active_for_user(user_id, self.clock.now())
            .await?;
        Ok(ActiveSummary {
            has_active_reservation: !active.is_empty(),
            active_count: active.len(),
        })
    }
}
