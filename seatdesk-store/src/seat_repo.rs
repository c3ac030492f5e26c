use async_trait::async_trait;
use sqlx::PgPool;

use seatdesk_core::{BookingResult, Seat, SeatCatalog};

use crate::database::storage_error;

pub struct PgSeatCatalog {
    pool: PgPool,
}

impl PgSeatCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SeatRow {
    seat_no: i32,
    type_no: i32,
    capacity: i32,
    location: String,
    notes: String,
}

impl From<SeatRow> for Seat {
    fn from(row: SeatRow) -> Self {
        Seat {
            seat_id: row.seat_no,
            type_id: row.type_no,
            capacity: row.capacity,
            location: row.location,
            notes: row.notes,
        }
    }
}

#[async_trait]
impl SeatCatalog for PgSeatCatalog {
    async fn get_seats(&self) -> BookingResult<Vec<Seat>> {
        let rows = sqlx::query_as::<_, SeatRow>(
            "SELECT seat_no, type_no, capacity, location, notes FROM seats ORDER BY seat_no",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(Seat::from).collect())
    }

    async fn get_seat(&self, seat_id: i32) -> BookingResult<Option<Seat>> {
        let row = sqlx::query_as::<_, SeatRow>(
            "SELECT seat_no, type_no, capacity, location, notes FROM seats WHERE seat_no = $1",
        )
        .bind(seat_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(Seat::from))
    }
}
