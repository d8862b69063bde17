use thiserror::Error;

use crate::actor_framework::FrameworkError;
use crate::domain::{BookingNumber, BookingStatus};
use crate::showtime_actor::ReservationError;

/// Errors that can occur during booking operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BookingError {
    #[error("booking not found: {0}")]
    NotFound(BookingNumber),
    #[error("booking {booking} cannot be cancelled: {reason}")]
    BookingNotCancellable { booking: BookingNumber, reason: String },
    #[error("booking {booking} is {from:?}; cannot {action}")]
    InvalidTransition {
        booking: BookingNumber,
        from: BookingStatus,
        action: &'static str,
    },
    #[error("booking {booking} is {status:?} but {pending} seat(s) could not be released: {source}")]
    ReleaseIncomplete {
        booking: BookingNumber,
        status: BookingStatus,
        pending: usize,
        source: ReservationError,
    },
    #[error("booking validation error: {0}")]
    Validation(String),
    #[error(transparent)]
    Reservation(#[from] ReservationError),
    #[error(transparent)]
    Framework(#[from] FrameworkError),
}

impl BookingError {
    pub fn is_transient(&self) -> bool {
        match self {
            BookingError::Framework(e) => e.is_transient(),
            BookingError::Reservation(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Rejections caused by the request itself rather than by the system.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            BookingError::BookingNotCancellable { .. }
                | BookingError::InvalidTransition { .. }
                | BookingError::Validation(_)
        )
    }
}
