use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use seatdesk_core::SeatAvailability;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: NaiveDate,
    pub start_hour: i32,
    pub end_hour: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/seats", get(list_seats))
}

/// GET /v1/seats?date=2024-01-01&start_hour=9&end_hour=12
async fn list_seats(
    State(state): State<AppState>,
    Query(q): Query<AvailabilityQuery>,
) -> Result<Json<Vec<SeatAvailability>>, AppError> {
    let seats = state
        .bookings
        .availability(q.date, q.start_hour, q.end_hour)
        .await?;
    Ok(Json(seats))
}
