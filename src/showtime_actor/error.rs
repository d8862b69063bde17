use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::{SeatClass, ShowtimeId, ShowtimeStatus};

/// Errors raised by the reservation engine.
///
/// None of these are retried inside the engine. `SeatUnavailable` and
/// `ConcurrentConflict` both mean "pick another seat or re-read availability",
/// never "send the same request again".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("seat {row}{number} is already booked")]
    SeatUnavailable { row: String, number: u32 },
    #[error("seat {row}{number} was taken concurrently (observed version {observed}, current {current})")]
    ConcurrentConflict {
        row: String,
        number: u32,
        observed: u64,
        current: u64,
    },
    #[error("no {class} seats remain")]
    InventoryExhausted { class: SeatClass },
    #[error("seat {row}{number} is not booked")]
    SeatNotFound { row: String, number: u32 },
    #[error("seat {row}{number} appears more than once in the request")]
    DuplicateSeat { row: String, number: u32 },
    #[error("showtime {id} is {status:?} and accepts no reservations")]
    ShowtimeClosed { id: ShowtimeId, status: ShowtimeStatus },
    #[error("showtime not found: {0}")]
    ShowtimeNotFound(ShowtimeId),
    #[error("invalid showtime: {0}")]
    Validation(String),
    #[error(transparent)]
    Framework(#[from] FrameworkError),
}

impl ReservationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ReservationError::Framework(e) if e.is_transient())
    }
}
