use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::overlap::overlaps;
use crate::{BookingError, BookingResult};

/// A bookable seat from the catalog. Occupancy is never stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Seat {
    pub seat_id: i32,
    pub type_id: i32,
    pub capacity: i32,
    pub location: String,
    pub notes: String,
}

/// Reservation status. The only legal transition is `Confirmed -> Canceled`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Confirmed,
    Canceled,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Confirmed => "CONFIRMED",
            ReservationStatus::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONFIRMED" => Ok(ReservationStatus::Confirmed),
            "CANCELED" => Ok(ReservationStatus::Canceled),
            other => Err(format!("unknown reservation status: {}", other)),
        }
    }
}

/// Half-open hour window `[start, end)` within a single day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HourRange {
    pub start: i32,
    pub end: i32,
}

impl HourRange {
    /// Fails with `InvalidRange` unless `0 <= start < end <= 24`.
    pub fn new(start: i32, end: i32) -> BookingResult<Self> {
        if start < 0 || end > 24 || start >= end {
            return Err(BookingError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn overlaps(&self, other: &HourRange) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }
}

/// A booking request as handed from the guard to the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewReservation {
    pub user_id: String,
    pub seat_id: i32,
    pub date: NaiveDate,
    pub start_hour: i32,
    pub end_hour: i32,
    /// Stored verbatim; the engine never interprets it.
    pub total_price: i64,
}

impl NewReservation {
    pub fn hours(&self) -> BookingResult<HourRange> {
        HourRange::new(self.start_hour, self.end_hour)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Reservation {
    pub resv_no: i64,
    pub user_id: String,
    pub seat_id: i32,
    pub date: NaiveDate,
    pub start_hour: i32,
    pub end_hour: i32,
    pub total_price: i64,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

impl Reservation {
    pub fn hours(&self) -> HourRange {
        HourRange {
            start: self.start_hour,
            end: self.end_hour,
        }
    }

    /// Venue-local instant at which the slot ends. An end hour of 24 is the
    /// following midnight. Saturates at `NaiveDateTime::MAX` past the last
    /// representable day, so such a slot never ends.
    pub fn end_instant(&self) -> NaiveDateTime {
        self.date
            .and_time(NaiveTime::MIN)
            .checked_add_signed(Duration::hours(i64::from(self.end_hour)))
            .unwrap_or(NaiveDateTime::MAX)
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == ReservationStatus::Confirmed
    }

    /// Confirmed and not yet ended at `now`.
    pub fn is_active_at(&self, now: NaiveDateTime) -> bool {
        self.is_confirmed() && self.end_instant() > now
    }

    /// Whether this reservation holds `seat_id` on `date` somewhere inside `hours`.
    pub fn blocks(&self, seat_id: i32, date: NaiveDate, hours: &HourRange) -> bool {
        self.is_confirmed()
            && self.seat_id == seat_id
            && self.date == date
            && self.hours().overlaps(hours)
    }
}

/// A reservation joined with the catalog row of its seat.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReservationDetail {
    #[serde(flatten)]
    pub reservation: Reservation,
    /// `None` when the seat has left the catalog.
    pub seat: Option<Seat>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatStatus {
    Free,
    Occupied,
}

/// A catalog seat together with its derived status for one query window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatAvailability {
    #[serde(flatten)]
    pub seat: Seat,
    pub status: SeatStatus,
}
