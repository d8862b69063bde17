use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{BookingNumber, Money};

/// Seat classes, each with its own capacity and price.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatClass {
    Regular,
    Premium,
    Vip,
    Wheelchair,
}

impl SeatClass {
    pub const ALL: [SeatClass; 4] = [
        SeatClass::Regular,
        SeatClass::Premium,
        SeatClass::Vip,
        SeatClass::Wheelchair,
    ];
}

impl fmt::Display for SeatClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SeatClass::Regular => "regular",
            SeatClass::Premium => "premium",
            SeatClass::Vip => "vip",
            SeatClass::Wheelchair => "wheelchair",
        };
        f.write_str(name)
    }
}

/// One counter per seat class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassCounts {
    pub regular: u32,
    pub premium: u32,
    pub vip: u32,
    pub wheelchair: u32,
}

impl ClassCounts {
    pub fn get(&self, class: SeatClass) -> u32 {
        match class {
            SeatClass::Regular => self.regular,
            SeatClass::Premium => self.premium,
            SeatClass::Vip => self.vip,
            SeatClass::Wheelchair => self.wheelchair,
        }
    }

    pub fn get_mut(&mut self, class: SeatClass) -> &mut u32 {
        match class {
            SeatClass::Regular => &mut self.regular,
            SeatClass::Premium => &mut self.premium,
            SeatClass::Vip => &mut self.vip,
            SeatClass::Wheelchair => &mut self.wheelchair,
        }
    }

    pub fn total(&self) -> u32 {
        SeatClass::ALL.iter().map(|class| self.get(*class)).sum()
    }
}

/// Ticket price per seat class.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassPrices {
    pub regular: Money,
    pub premium: Money,
    pub vip: Money,
    pub wheelchair: Money,
}

impl ClassPrices {
    /// Same price for every class.
    pub const fn flat(price: Money) -> Self {
        Self {
            regular: price,
            premium: price,
            vip: price,
            wheelchair: price,
        }
    }

    pub fn get(&self, class: SeatClass) -> Money {
        match class {
            SeatClass::Regular => self.regular,
            SeatClass::Premium => self.premium,
            SeatClass::Vip => self.vip,
            SeatClass::Wheelchair => self.wheelchair,
        }
    }
}

/// A seat as requested by a customer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seat {
    pub row: String,
    pub number: u32,
    pub class: SeatClass,
}

impl Seat {
    pub fn new(row: impl Into<String>, number: u32, class: SeatClass) -> Self {
        Self {
            row: row.into(),
            number,
            class,
        }
    }

    pub fn regular(row: impl Into<String>, number: u32) -> Self {
        Self::new(row, number, SeatClass::Regular)
    }

    pub fn same_position(&self, row: &str, number: u32) -> bool {
        self.row == row && self.number == number
    }
}

impl fmt::Display for Seat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{} ({})", self.row, self.number, self.class)
    }
}

/// A seat held in a showtime's seat map, tagged with the booking holding it.
///
/// The booking is referenced by number only; the seat map never owns bookings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookedSeat {
    pub row: String,
    pub number: u32,
    pub class: SeatClass,
    pub booking: BookingNumber,
    pub reserved_at: DateTime<Utc>,
    /// Seat-map version produced by the reservation that placed this entry
    pub booked_at_version: u64,
}

impl BookedSeat {
    pub fn seat(&self) -> Seat {
        Seat::new(self.row.clone(), self.number, self.class)
    }
}
