use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BookedSeat, BookingNumber, ClassCounts, ClassPrices, ClockTime, MovieId, SeatClass, ShowtimeId, TheaterId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowtimeStatus {
    Scheduled,
    Cancelled,
    Completed,
}

impl ShowtimeStatus {
    /// A retired showtime accepts releases but no new reservations.
    pub const fn is_retired(&self) -> bool {
        matches!(self, ShowtimeStatus::Cancelled | ShowtimeStatus::Completed)
    }
}

/// One screening and its seat inventory (the seat map).
///
/// Counters and `booked_seats` only change through the reservation actions in
/// [`crate::showtime_actor`]; `version` is bumped by each of those mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Showtime {
    pub id: ShowtimeId,
    pub movie_id: MovieId,
    pub theater_id: TheaterId,
    pub hall: String,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub capacity: ClassCounts,
    pub available: ClassCounts,
    pub prices: ClassPrices,
    pub booked_seats: Vec<BookedSeat>,
    pub status: ShowtimeStatus,
    pub version: u64,
}

/// Parameters for scheduling a showtime.
#[derive(Debug, Clone)]
pub struct ShowtimeCreate {
    pub movie_id: MovieId,
    pub theater_id: TheaterId,
    pub hall: String,
    pub date: NaiveDate,
    pub start_time: ClockTime,
    pub end_time: ClockTime,
    pub capacity: ClassCounts,
    pub prices: ClassPrices,
}

/// Catalog-side changes. Seat inventory is not patchable.
#[derive(Debug, Clone, Default)]
pub struct ShowtimePatch {
    pub status: Option<ShowtimeStatus>,
    pub prices: Option<ClassPrices>,
}

impl Showtime {
    pub fn booked_count(&self, class: SeatClass) -> u32 {
        let count = self.booked_seats.iter().filter(|s| s.class == class).count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub fn is_booked(&self, row: &str, number: u32) -> bool {
        self.booked_seats.iter().any(|s| s.row == row && s.number == number)
    }

    pub fn seats_of<'a>(&'a self, booking: &'a BookingNumber) -> impl Iterator<Item = &'a BookedSeat> + 'a {
        self.booked_seats.iter().filter(move |s| &s.booking == booking)
    }

    /// `available + booked == capacity` per class, and no position booked twice.
    pub fn invariants_hold(&self) -> bool {
        let counts_balance = SeatClass::ALL.iter().all(|class| {
            u64::from(self.available.get(*class)) + u64::from(self.booked_count(*class))
                == u64::from(self.capacity.get(*class))
        });
        let unique_positions = self.booked_seats.iter().enumerate().all(|(i, seat)| {
            !self.booked_seats[i + 1..]
                .iter()
                .any(|other| other.row == seat.row && other.number == seat.number)
        });
        counts_balance && unique_positions
    }
}
