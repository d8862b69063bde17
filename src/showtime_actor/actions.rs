use chrono::{DateTime, Utc};

use crate::domain::{BookedSeat, BookingNumber, ClassCounts, ClassPrices, Seat, ShowtimeId};

/// Seat-map operations. Each one is evaluated and applied in a single step.
#[derive(Debug, Clone)]
pub enum ShowtimeAction {
    /// Claim one seat if it is free and its class has availability.
    ///
    /// `observed_version` is the seat-map version the caller based its choice
    /// on, if any; it only changes which error a lost race reports.
    BookSeat {
        seat: Seat,
        booking: BookingNumber,
        observed_version: Option<u64>,
        reserved_at: DateTime<Utc>,
    },
    /// Claim several seats for one booking, all or nothing.
    BookSeats {
        seats: Vec<Seat>,
        booking: BookingNumber,
        observed_version: Option<u64>,
        reserved_at: DateTime<Utc>,
    },
    /// Return a seat to inventory. With `booking` set, only that booking's entry matches.
    ReleaseSeat {
        row: String,
        number: u32,
        booking: Option<BookingNumber>,
    },
    /// Read the counters without mutating anything.
    Availability,
}

/// Post-update proof of a successful reservation or release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub showtime_id: ShowtimeId,
    pub seats: Vec<BookedSeat>,
    pub available: ClassCounts,
    /// Prices in force when this step was applied
    pub prices: ClassPrices,
    pub version: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Availability {
    pub capacity: ClassCounts,
    pub available: ClassCounts,
    pub version: u64,
}

/// Results from ShowtimeActions - variants match 1:1 with ShowtimeAction
#[derive(Debug, Clone)]
pub enum ShowtimeActionResult {
    BookSeat(Reservation),
    BookSeats(Reservation),
    ReleaseSeat(Reservation),
    Availability(Availability),
}
