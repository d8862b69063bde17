//! Cancellation eligibility and refund tiers.
//!
//! Pure functions of the show start, the current time and the booking total:
//!
//! | time left before show | cancellable | refund         |
//! |-----------------------|-------------|----------------|
//! | more than 24h         | yes         | 100%           |
//! | more than 2h, ≤ 24h   | yes         | 50%            |
//! | 2h or less            | no          | 0              |

use chrono::{DateTime, Duration, Utc};

use crate::domain::{BookingStatus, Money};

pub const CANCELLATION_CUTOFF_HOURS: i64 = 2;
pub const FULL_REFUND_HOURS: i64 = 24;

/// Outcome of evaluating a cancellation request at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationQuote {
    pub can_cancel: bool,
    pub refund_amount: Money,
}

pub fn can_cancel(status: BookingStatus, show_starts_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    if matches!(status, BookingStatus::Cancelled | BookingStatus::Completed) {
        return false;
    }
    show_starts_at - now > Duration::hours(CANCELLATION_CUTOFF_HOURS)
}

pub fn refund_amount(
    status: BookingStatus,
    show_starts_at: DateTime<Utc>,
    now: DateTime<Utc>,
    total_amount: Money,
) -> Money {
    if !can_cancel(status, show_starts_at, now) {
        return Money::ZERO;
    }
    let remaining = show_starts_at - now;
    if remaining > Duration::hours(FULL_REFUND_HOURS) {
        total_amount
    } else if remaining > Duration::hours(CANCELLATION_CUTOFF_HOURS) {
        total_amount.half()
    } else {
        Money::ZERO
    }
}

pub fn quote(
    status: BookingStatus,
    show_starts_at: DateTime<Utc>,
    now: DateTime<Utc>,
    total_amount: Money,
) -> CancellationQuote {
    CancellationQuote {
        can_cancel: can_cancel(status, show_starts_at, now),
        refund_amount: refund_amount(status, show_starts_at, now, total_amount),
    }
}
