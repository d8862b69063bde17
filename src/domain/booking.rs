use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BookingNumber, ClockTime, Money, MovieId, Seat, ShowtimeId, TheaterId, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Expired,
    Completed,
}

impl BookingStatus {
    /// No further status transition is possible.
    pub const fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Expired | BookingStatus::Completed)
    }

    /// Whether this booking still owns its seats in the seat map.
    pub const fn holds_seats(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::Completed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CancellationActor {
    User,
    Admin,
    System,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundStatus {
    Pending,
    Processed,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Payment state as reported by the gateway; only the status drives transitions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub method: String,
    pub transaction_id: Option<String>,
    pub status: PaymentStatus,
}

impl Payment {
    pub fn pending(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            transaction_id: None,
            status: PaymentStatus::Pending,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cancellation {
    pub cancelled_at: DateTime<Utc>,
    pub cancelled_by: CancellationActor,
    pub refund_amount: Money,
    pub refund_status: RefundStatus,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub seat: Seat,
    pub price: Money,
    pub ticket_id: String,
}

/// One purchase: an ordered list of tickets for one showtime.
///
/// Catalog references are identifiers only. `show_date`/`show_time` are copied at
/// booking time so refund math does not move if the showtime is edited later.
/// `cancellation` is `Some` exactly when `status` is `Cancelled`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub booking_number: BookingNumber,
    pub user_id: UserId,
    pub showtime_id: ShowtimeId,
    pub movie_id: MovieId,
    pub theater_id: TheaterId,
    pub tickets: Vec<Ticket>,
    pub total_amount: Money,
    pub payment: Payment,
    pub status: BookingStatus,
    pub show_date: NaiveDate,
    pub show_time: ClockTime,
    pub created_at: DateTime<Utc>,
    pub hold_expires_at: DateTime<Utc>,
    pub cancellation: Option<Cancellation>,
}

/// A priced seat awaiting its ticket identifier.
#[derive(Debug, Clone)]
pub struct TicketDraft {
    pub seat: Seat,
    pub price: Money,
}

/// Parameters for recording a booking whose seats are already reserved.
#[derive(Debug, Clone)]
pub struct BookingCreate {
    pub user_id: UserId,
    pub showtime_id: ShowtimeId,
    pub movie_id: MovieId,
    pub theater_id: TheaterId,
    pub tickets: Vec<TicketDraft>,
    pub payment: Payment,
    pub show_date: NaiveDate,
    pub show_time: ClockTime,
    pub created_at: DateTime<Utc>,
    pub hold_expires_at: DateTime<Utc>,
}

impl Booking {
    pub fn show_starts_at(&self) -> DateTime<Utc> {
        self.show_date.and_time(self.show_time.to_naive_time()).and_utc()
    }

    pub fn seats(&self) -> impl Iterator<Item = &Seat> {
        self.tickets.iter().map(|ticket| &ticket.seat)
    }

    pub fn invariants_hold(&self) -> bool {
        let total: Money = self.tickets.iter().map(|t| t.price).sum();
        total == self.total_amount && self.cancellation.is_some() == (self.status == BookingStatus::Cancelled)
    }
}
