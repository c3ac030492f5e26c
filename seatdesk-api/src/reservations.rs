use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use seatdesk_booking::ActiveSummary;
use seatdesk_core::{NewReservation, Reservation, ReservationDetail};

use crate::error::AppError;
use crate::middleware::auth::UserClaims;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub seat_id: i32,
    pub date: NaiveDate,
    pub start_hour: i32,
    pub end_hour: i32,
    pub total_price: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub success: bool,
    pub reservation: Reservation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReservationListResponse {
    pub success: bool,
    pub reservations: Vec<ReservationDetail>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/reservations", post(book))
        .route("/v1/reservations/mine", get(my_reservations))
        .route("/v1/reservations/active", get(active_reservation))
        .route("/v1/reservations/{resv_no}/cancel", post(cancel))
}

/// POST /v1/reservations
async fn book(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Json(req): Json<BookRequest>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state
        .bookings
        .book(NewReservation {
            user_id: claims.sub,
            seat_id: req.seat_id,
            date: req.date,
            start_hour: req.start_hour,
            end_hour: req.end_hour,
            total_price: req.total_price,
        })
        .await?;

    Ok(Json(ReservationResponse {
        success: true,
        reservation,
    }))
}

/// GET /v1/reservations/mine
async fn my_reservations(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<ReservationListResponse>, AppError> {
    let reservations = state.bookings.my_reservations(&claims.sub).await?;
    Ok(Json(ReservationListResponse {
        success: true,
        reservations,
    }))
}

/// GET /v1/reservations/active
async fn active_reservation(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
) -> Result<Json<ActiveSummary>, AppError> {
    Ok(Json(state.bookings.active_reservation(&claims.sub).await?))
}

/// POST /v1/reservations/{resv_no}/cancel
async fn cancel(
    State(state): State<AppState>,
    Extension(claims): Extension<UserClaims>,
    Path(resv_no): Path<i64>,
) -> Result<Json<ReservationResponse>, AppError> {
    let reservation = state.bookings.cancel(resv_no, &claims.sub).await?;
    info!("User {} canceled reservation {}", claims.sub, resv_no);
    Ok(Json(ReservationResponse {
        success: true,
        reservation,
    }))
}
