use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::debug;

use seatdesk_core::{
    BookingResult, HourRange, ReservationLedger, SeatAvailability, SeatCatalog, SeatStatus,
};

/// Derives per-seat occupancy for a date and hour window.
///
/// The result is a snapshot of the ledger at read time. It can be stale by
/// the time the caller acts on it; `ReservationGuard` checks again on commit.
pub struct AvailabilityResolver {
    catalog: Arc<dyn SeatCatalog>,
    ledger: Arc<dyn ReservationLedger>,
}

impl AvailabilityResolver {
    pub fn new(catalog: Arc<dyn SeatCatalog>, ledger: Arc<dyn ReservationLedger>) -> Self {
        Self { catalog, ledger }
    }

    /// Seat id to status for every seat in the catalog.
    pub async fn resolve(
        &self,
        date: NaiveDate,
        window_start: i32,
        window_end: i32,
    ) -> BookingResult<BTreeMap<i32, SeatStatus>> {
        let rows = self.resolve_seats(date, window_start, window_end).await?;
        Ok(rows.into_iter().map(|r| (r.seat.seat_id, r.status)).collect())
    }

    /// Catalog rows with their derived status, ordered by seat id.
    pub async fn resolve_seats(
        &self,
        date: NaiveDate,
        window_start: i32,
        window_end: i32,
    ) -> BookingResult<Vec<SeatAvailability>> {
        let window = HourRange::new(window_start, window_end)?;

        let seats = self.catalog.get_seats().await?;
        let occupied: HashSet<i32> = self
            .ledger
            .confirmed_on(date)
            .await?
            .into_iter()
            .filter(|r| r.hours().overlaps(&window))
            .map(|r| r.seat_id)
            .collect();

        debug!(
            "Resolved {} occupied of {} seats on {} [{}, {})",
            occupied.len(),
            seats.len(),
            date,
            window.start,
            window.end
        );

        Ok(seats
            .into_iter()
            .map(|seat| {
                let status = if occupied.contains(&seat.seat_id) {
                    SeatStatus::Occupied
                } else {
                    SeatStatus::Free
                };
                SeatAvailability { seat, status }
            })
            .collect())
    }
}
