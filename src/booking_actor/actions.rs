use chrono::{DateTime, Utc};

use crate::domain::{CancellationActor, RefundStatus};

/// Status transitions of a booking.
///
/// ```text
/// pending ──confirm──▶ confirmed ──complete──▶ completed
///    │                     │
///    ├──expire──▶ expired  │
///    └──────cancel─────────┴──▶ cancelled
/// ```
///
/// Seat releases are not part of these actions; the booking client performs
/// them after a transition into `cancelled` or `expired` succeeds.
#[derive(Debug, Clone)]
pub enum BookingAction {
    /// Payment gateway reported success.
    ConfirmPayment { transaction_id: Option<String> },
    /// Payment gateway reported failure. The booking stays pending until expired.
    FailPayment { transaction_id: Option<String> },
    Cancel { actor: CancellationActor, now: DateTime<Utc> },
    /// Allowed once the hold has run out, or at any time after a failed payment.
    Expire { now: DateTime<Utc> },
    /// The screening took place.
    Complete,
    /// Outcome of the refund issued for a cancellation.
    SettleRefund { outcome: RefundStatus },
}

impl BookingAction {
    pub fn name(&self) -> &'static str {
        match self {
            BookingAction::ConfirmPayment { .. } => "confirm",
            BookingAction::FailPayment { .. } => "fail_payment",
            BookingAction::Cancel { .. } => "cancel",
            BookingAction::Expire { .. } => "expire",
            BookingAction::Complete => "complete",
            BookingAction::SettleRefund { .. } => "settle_refund",
        }
    }
}
