use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::{info, warn};

use seatdesk_core::{
    BookingError, BookingResult, CancellationPolicy, Clock, HourRange, NewReservation,
    Reservation, ReservationLedger,
};

use crate::database::{sql_state, storage_error, EXCLUSION_VIOLATION, FOREIGN_KEY_VIOLATION};

const COLUMNS: &str =
    "resv_no, user_id, seat_no, resv_date, start_hour, end_hour, total_price, status, created_at";

// Advisory lock namespaces (first key of the two-key form).
const USER_LOCK_SPACE: i32 = 1;
const SEAT_LOCK_SPACE: i32 = 2;

/// Postgres-backed ledger.
///
/// `commit` holds transaction-scoped advisory locks on the user and on the
/// seat+date (always in that order) while it re-validates and inserts, so two
/// commits racing on either key are serialised. The table's exclusion
/// constraint rejects overlapping confirmed rows even if a writer bypasses
/// this type.
pub struct PgReservationLedger {
    pool: PgPool,
    clock: Arc<dyn Clock>,
}

impl PgReservationLedger {
    pub fn new(pool: PgPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    resv_no: i64,
    user_id: String,
    seat_no: i32,
    resv_date: NaiveDate,
    start_hour: i32,
    end_hour: i32,
    total_price: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl ReservationRow {
    fn into_reservation(self) -> BookingResult<Reservation> {
        let status = self.status.parse().map_err(BookingError::StorageUnavailable)?;
        Ok(Reservation {
            resv_no: self.resv_no,
            user_id: self.user_id,
            seat_id: self.seat_no,
            date: self.resv_date,
            start_hour: self.start_hour,
            end_hour: self.end_hour,
            total_price: self.total_price,
            status,
            created_at: self.created_at,
        })
    }
}

fn into_reservations(rows: Vec<ReservationRow>) -> BookingResult<Vec<Reservation>> {
    rows.into_iter().map(ReservationRow::into_reservation).collect()
}

async fn lock_key(conn: &mut PgConnection, space: i32, key: &str) -> BookingResult<()> {
    sqlx::query("SELECT pg_advisory_xact_lock($1, hashtext($2))")
        .bind(space)
        .bind(key)
        .execute(conn)
        .await
        .map_err(storage_error)?;
    Ok(())
}

async fn load_active(
    conn: &mut PgConnection,
    user_id: &str,
    now: NaiveDateTime,
) -> BookingResult<Vec<Reservation>> {
    let rows = sqlx::query_as::<_, ReservationRow>(&format!(
        "SELECT {COLUMNS} FROM reservations \
         WHERE user_id = $1 AND status = 'CONFIRMED' AND resv_date >= $2"
    ))
    .bind(user_id)
    .bind(now.date())
    .fetch_all(conn)
    .await
    .map_err(storage_error)?;

    Ok(into_reservations(rows)?
        .into_iter()
        .filter(|r| r.is_active_at(now))
        .collect())
}

fn seat_conflict(request: &NewReservation, hours: &HourRange) -> BookingError {
    BookingError::SeatConflict {
        seat_id: request.seat_id,
        date: request.date,
        start: hours.start,
        end: hours.end,
    }
}

#[async_trait]
impl ReservationLedger for PgReservationLedger {
    async fn commit(&self, request: &NewReservation) -> BookingResult<Reservation> {
        let hours = request.hours()?;
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        lock_key(&mut tx, USER_LOCK_SPACE, &request.user_id).await?;
        lock_key(
            &mut tx,
            SEAT_LOCK_SPACE,
            &format!("{}:{}", request.seat_id, request.date),
        )
        .await?;

        let now = self.clock.now();
        if !load_active(&mut tx, &request.user_id, now).await?.is_empty() {
            warn!("Commit rejected, user {} already active", request.user_id);
            return Err(BookingError::ActiveReservationExists(request.user_id.clone()));
        }

        let clash: Option<i64> = sqlx::query_scalar(
            "SELECT resv_no FROM reservations \
             WHERE seat_no = $1 AND resv_date = $2 AND status = 'CONFIRMED' \
               AND start_hour < $4 AND end_hour > $3 \
             LIMIT 1",
        )
        .bind(request.seat_id)
        .bind(request.date)
        .bind(hours.start)
        .bind(hours.end)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?;

        if let Some(existing) = clash {
            warn!(
                "Commit rejected, seat {} on {} clashes with #{}",
                request.seat_id, request.date, existing
            );
            return Err(seat_conflict(request, &hours));
        }

        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "INSERT INTO reservations \
                 (user_id, seat_no, resv_date, start_hour, end_hour, total_price, status) \
             VALUES ($1, $2, $3, $4, $5, $6, 'CONFIRMED') \
             RETURNING {COLUMNS}"
        ))
        .bind(&request.user_id)
        .bind(request.seat_id)
        .bind(request.date)
        .bind(hours.start)
        .bind(hours.end)
        .bind(request.total_price)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match sql_state(&e).as_deref() {
            Some(EXCLUSION_VIOLATION) => seat_conflict(request, &hours),
            Some(FOREIGN_KEY_VIOLATION) => BookingError::UnknownSeat(request.seat_id),
            _ => storage_error(e),
        })?;

        tx.commit().await.map_err(storage_error)?;

        let reservation = row.into_reservation()?;
        info!("Reservation {} committed", reservation.resv_no);
        Ok(reservation)
    }

    async fn cancel(&self, resv_no: i64, requesting_user: &str) -> BookingResult<Reservation> {
        let mut tx = self.pool.begin().await.map_err(storage_error)?;

        let current = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {COLUMNS} FROM reservations WHERE resv_no = $1 FOR UPDATE"
        ))
        .bind(resv_no)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?
        .ok_or(BookingError::NotFound(resv_no))?
        .into_reservation()?;

        CancellationPolicy::check(&current, requesting_user, self.clock.now())?;

        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            "UPDATE reservations SET status = 'CANCELED' \
             WHERE resv_no = $1 AND status = 'CONFIRMED' \
             RETURNING {COLUMNS}"
        ))
        .bind(resv_no)
        .fetch_optional(&mut *tx)
        .await
        .map_err(storage_error)?
        // The row lock makes this unreachable unless the status changed outside a transaction.
        .ok_or(BookingError::AlreadyCanceled(resv_no))?;

        tx.commit().await.map_err(storage_error)?;

        info!("Reservation {} canceled", resv_no);
        row.into_reservation()
    }

    async fn list_by_user(&self, user_id: &str) -> BookingResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {COLUMNS} FROM reservations WHERE user_id = $1 \
             ORDER BY resv_date DESC, start_hour DESC, resv_no DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        into_reservations(rows)
    }

    async fn get(&self, resv_no: i64) -> BookingResult<Option<Reservation>> {
        sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {COLUMNS} FROM reservations WHERE resv_no = $1"
        ))
        .bind(resv_no)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?
        .map(ReservationRow::into_reservation)
        .transpose()
    }

    async fn confirmed_on(&self, date: NaiveDate) -> BookingResult<Vec<Reservation>> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            "SELECT {COLUMNS} FROM reservations \
             WHERE resv_date = $1 AND status = 'CONFIRMED' \
             ORDER BY seat_no, start_hour"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        into_reservations(rows)
    }

    async fn active_for_user(
        &self,
        user_id: &str,
        now: NaiveDateTime,
    ) -> BookingResult<Vec<Reservation>> {
        let mut conn = self.pool.acquire().await.map_err(storage_error)?;
        load_active(&mut conn, user_id, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatdesk_core::{FixedClock, ReservationStatus};

    async fn seed_seats(pool: &PgPool) {
        for seat_no in 1..=10 {
            sqlx::query("INSERT INTO seats (seat_no, type_no, location) VALUES ($1, 1, $2)")
                .bind(seat_no)
                .bind(format!("A-{}", seat_no))
                .execute(pool)
                .await
                .unwrap();
        }
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

    async fn ledger(pool: PgPool) -> (Arc<FixedClock>, Arc<PgReservationLedger>) {
        seed_seats(&pool).await;
        let clock = Arc::new(FixedClock::new("2023-12-31T12:00:00".parse().unwrap()));
        (clock.clone(), Arc::new(PgReservationLedger::new(pool, clock)))
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_commit_and_cancel(pool: PgPool) {
        let (clock, ledger) = ledger(pool).await;

        let r = ledger.commit(&request("alice", 5, 9, 12)).await.unwrap();
        assert_eq!(r.status, ReservationStatus::Confirmed);

        assert!(matches!(
            ledger.commit(&request("bob", 5, 10, 11)).await.unwrap_err(),
            BookingError::SeatConflict { .. }
        ));
        assert_eq!(
            ledger.commit(&request("alice", 7, 14, 16)).await.unwrap_err(),
            BookingError::ActiveReservationExists("alice".to_string())
        );
        assert_eq!(
            ledger.commit(&request("carol", 99, 9, 12)).await.unwrap_err(),
            BookingError::UnknownSeat(99)
        );

        assert_eq!(
            ledger.cancel(r.resv_no, "bob").await.unwrap_err(),
            BookingError::Forbidden(r.resv_no)
        );
        let canceled = ledger.cancel(r.resv_no, "alice").await.unwrap();
        assert_eq!(canceled.status, ReservationStatus::Canceled);
        assert_eq!(
            ledger.cancel(r.resv_no, "alice").await.unwrap_err(),
            BookingError::AlreadyCanceled(r.resv_no)
        );

        let bob = ledger.commit(&request("bob", 5, 10, 11)).await.unwrap();
        clock.set("2024-01-01T12:00:00".parse().unwrap());
        assert_eq!(
            ledger.cancel(bob.resv_no, "bob").await.unwrap_err(),
            BookingError::AlreadyEnded(bob.resv_no)
        );
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_commits_admit_one(pool: PgPool) {
        let (_, ledger) = ledger(pool).await;

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ledger = ledger.clone();
                tokio::spawn(async move {
                    ledger.commit(&request(&format!("user-{}", i), 5, 8 + i % 3, 12)).await
                })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(
            ledger.confirmed_on("2024-01-01".parse().unwrap()).await.unwrap().len(),
            1
        );
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_canceled_status_is_terminal_in_schema(pool: PgPool) {
        let (_, ledger) = ledger(pool.clone()).await;
        let r = ledger.commit(&request("alice", 5, 9, 12)).await.unwrap();
        ledger.cancel(r.resv_no, "alice").await.unwrap();

        let revived = sqlx::query("UPDATE reservations SET status = 'CONFIRMED' WHERE resv_no = $1")
            .bind(r.resv_no)
            .execute(&pool)
            .await;
        assert!(revived.is_err());
    }

    #[sqlx::test(migrations = "../migrations")]
    #[ignore = "requires DATABASE_URL"]
    async fn test_list_by_user_order(pool: PgPool) {
        let (clock, ledger) = ledger(pool).await;
        ledger.commit(&request("alice", 1, 9, 10)).await.unwrap();
        clock.set("2024-01-01T11:00:00".parse().unwrap());
        ledger.commit(&request("alice", 2, 13, 15)).await.unwrap();

        let list = ledger.list_by_user("alice").await.unwrap();
        let starts: Vec<i32> = list.iter().map(|r| r.start_hour).collect();
        assert_eq!(starts, vec![13, 9]);
    }
}
