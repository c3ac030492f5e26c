use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use seatdesk_core::{
    BookingError, BookingResult, CancellationPolicy, Clock, NewReservation, Reservation,
    ReservationLedger, ReservationStatus, Seat, SeatCatalog,
};

/// Fixed seat catalog held in memory.
pub struct InMemorySeatCatalog {
    seats: BTreeMap<i32, Seat>,
}

impl InMemorySeatCatalog {
    pub fn new(seats: impl IntoIterator<Item = Seat>) -> Self {
        Self {
            seats: seats.into_iter().map(|s| (s.seat_id, s)).collect(),
        }
    }
}

#[async_trait]
impl SeatCatalog for InMemorySeatCatalog {
    async fn get_seats(&self) -> BookingResult<Vec<Seat>> {
        Ok(self.seats.values().cloned().collect())
    }

    async fn get_seat(&self, seat_id: i32) -> BookingResult<Option<Seat>> {
        Ok(self.seats.get(&seat_id).cloned())
    }
}

#[derive(Default)]
struct LedgerState {
    reservations: HashMap<i64, Reservation>,
    last_resv_no: i64,
}

impl LedgerState {
    fn next_resv_no(&mut self) -> i64 {
        self.last_resv_no += 1;
        self.last_resv_no
    }
}

/// Ledger kept in process memory.
///
/// Every operation runs under one lock, so commits and cancels are trivially
/// linearizable. Numbers come from a counter guarded by the same lock and are
/// never handed out twice. Commits for seats missing from `catalog` fail with
/// `UnknownSeat`, as the seat foreign key does in Postgres.
pub struct InMemoryLedger {
    state: Mutex<LedgerState>,
    catalog: Arc<dyn SeatCatalog>,
    clock: Arc<dyn Clock>,
}

impl InMemoryLedger {
    pub fn new(catalog: Arc<dyn SeatCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(LedgerState::default()),
            catalog,
            clock,
        }
    }
}

#[async_trait]
impl ReservationLedger for InMemoryLedger {
    async fn commit(&self, request: &NewReservation) -> BookingResult<Reservation> {
        let hours = request.hours()?;
        // The catalog never shrinks, so this holds once the lock is taken.
        if self.catalog.get_seat(request.seat_id).await?.is_none() {
            warn!("Commit rejected, seat {} is not in the catalog", request.seat_id);
            return Err(BookingError::UnknownSeat(request.seat_id));
        }

        let mut state = self.state.lock().await;
        let now = self.clock.now();

        if state
            .reservations
            .values()
            .any(|r| r.user_id == request.user_id && r.is_active_at(now))
        {
            warn!("Commit rejected, user {} already active", request.user_id);
            return Err(BookingError::ActiveReservationExists(request.user_id.clone()));
        }

        if state
            .reservations
            .values()
            .any(|r| r.blocks(request.seat_id, request.date, &hours))
        {
            warn!(
                "Commit rejected, seat {} taken on {} within [{}, {})",
                request.seat_id, request.date, hours.start, hours.end
            );
            return Err(BookingError::SeatConflict {
                seat_id: request.seat_id,
                date: request.date,
                start: hours.start,
                end: hours.end,
            });
        }

        let reservation = Reservation {
            resv_no: state.next_resv_no(),
            user_id: request.user_id.clone(),
            seat_id: request.seat_id,
            date: request.date,
            start_hour: hours.start,
            end_hour: hours.end,
            total_price: request.total_price,
            status: ReservationStatus::Confirmed,
            created_at: Utc::now(),
        };
        state
            .reservations
            .insert(reservation.resv_no, reservation.clone());

        info!("Reservation {} committed", reservation.resv_no);
        Ok(reservation)
    }

    async fn cancel(&self, resv_no: i64, requesting_user: &str) -> BookingResult<Reservation> {
        let mut state = self.state.lock().await;
        let now = self.clock.now();

        let reservation = state
            .reservations
            .get_mut(&resv_no)
            .ok_or(BookingError::NotFound(resv_no))?;

        CancellationPolicy::check(reservation, requesting_user, now)?;
        reservation.status = ReservationStatus::Canceled;

        info!("Reservation {} canceled", resv_no);
        Ok(reservation.clone())
    }

    async fn list_by_user(&self, user_id: &str) -> BookingResult<Vec<Reservation>> {
        let state = self.state.lock().await;
        let mut list: Vec<Reservation> = state
            .reservations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then(b.start_hour.cmp(&a.start_hour))
                .then(b.resv_no.cmp(&a.resv_no))
        });
        Ok(list)
    }

    async fn get(&self, resv_no: i64) -> BookingResult<Option<Reservation>> {
        Ok(self.state.lock().await.reservations.get(&resv_no).cloned())
    }

    async fn confirmed_on(&self, date: NaiveDate) -> BookingResult<Vec<Reservation>> {
        let state = self.state.lock().await;
        Ok(state
            .reservations
            .values()
            .filter(|r| r.date == date && r.is_confirmed())
            .cloned()
            .collect())
    }

    async fn active_for_user(
        &self,
        user_id: &str,
        now: NaiveDateTime,
    ) -> BookingResult<Vec<Reservation>> {
        let state = self.state.lock().await;
        Ok(state
            .reservations
            .values()
            .filter(|r| r.user_id == user_id && r.is_active_at(now))
            .cloned()
            .collect())
    }
}
