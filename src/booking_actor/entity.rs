use tracing::info;

use super::actions::BookingAction;
use super::error::BookingError;
use crate::actor_framework::Entity;
use crate::domain::{
    Booking, BookingCreate, BookingNumber, BookingStatus, Cancellation, Money, PaymentStatus, RefundStatus, Ticket,
};
use crate::policy;

impl Entity for Booking {
    type Id = BookingNumber;
    type CreateParams = BookingCreate;
    type Patch = ();
    type Action = BookingAction;
    type ActionResult = Booking;
    type Error = BookingError;

    fn id(&self) -> &BookingNumber {
        &self.booking_number
    }

    /// Records a pending booking for seats that are already reserved.
    ///
    /// Ticket identifiers are back-filled from the booking number here, and the
    /// total is the sum of the ticket prices.
    fn from_create_params(booking_number: BookingNumber, params: BookingCreate) -> Result<Self, BookingError> {
        if params.tickets.is_empty() {
            return Err(BookingError::Validation("a booking needs at least one ticket".into()));
        }
        if params.payment.status != PaymentStatus::Pending {
            return Err(BookingError::Validation(format!(
                "new bookings start with a pending payment, got {:?}",
                params.payment.status
            )));
        }

        let tickets: Vec<Ticket> = params
            .tickets
            .into_iter()
            .enumerate()
            .map(|(i, draft)| Ticket {
                seat: draft.seat,
                price: draft.price,
                ticket_id: booking_number.ticket_id(i + 1),
            })
            .collect();
        let total_amount: Money = tickets.iter().map(|t| t.price).sum();

        Ok(Self {
            booking_number,
            user_id: params.user_id,
            showtime_id: params.showtime_id,
            movie_id: params.movie_id,
            theater_id: params.theater_id,
            tickets,
            total_amount,
            payment: params.payment,
            status: BookingStatus::Pending,
            show_date: params.show_date,
            show_time: params.show_time,
            created_at: params.created_at,
            hold_expires_at: params.hold_expires_at,
            cancellation: None,
        })
    }

    fn on_update(&mut self, _patch: ()) -> Result<(), BookingError> {
        Ok(())
    }

    fn on_delete(&self) -> Result<(), BookingError> {
        if !self.status.is_terminal() {
            return Err(BookingError::Validation(format!(
                "booking {} still holds seats; cancel or expire it first",
                self.booking_number
            )));
        }
        Ok(())
    }

    fn handle_action(&mut self, action: BookingAction) -> Result<Booking, BookingError> {
        let name = action.name();
        match action {
            BookingAction::ConfirmPayment { transaction_id } => {
                self.require(BookingStatus::Pending, name)?;
                self.status = BookingStatus::Confirmed;
                self.payment.status = PaymentStatus::Completed;
                if transaction_id.is_some() {
                    self.payment.transaction_id = transaction_id;
                }
            }
            BookingAction::FailPayment { transaction_id } => {
                self.require(BookingStatus::Pending, name)?;
                self.payment.status = PaymentStatus::Failed;
                if transaction_id.is_some() {
                    self.payment.transaction_id = transaction_id;
                }
            }
            BookingAction::Cancel { actor, now } => {
                if !matches!(self.status, BookingStatus::Pending | BookingStatus::Confirmed) {
                    return Err(self.not_cancellable(format!("booking is {:?}", self.status)));
                }
                let quote = policy::quote(self.status, self.show_starts_at(), now, self.total_amount);
                if !quote.can_cancel {
                    return Err(self.not_cancellable(format!(
                        "cancellations close {} hours before the show",
                        policy::CANCELLATION_CUTOFF_HOURS
                    )));
                }
                self.status = BookingStatus::Cancelled;
                self.cancellation = Some(Cancellation {
                    cancelled_at: now,
                    cancelled_by: actor,
                    refund_amount: quote.refund_amount,
                    refund_status: RefundStatus::Pending,
                });
            }
            BookingAction::Expire { now } => {
                self.require(BookingStatus::Pending, name)?;
                if self.payment.status != PaymentStatus::Failed && now < self.hold_expires_at {
                    return Err(BookingError::Validation(format!(
                        "booking {} is held until {}",
                        self.booking_number, self.hold_expires_at
                    )));
                }
                self.status = BookingStatus::Expired;
            }
            BookingAction::Complete => {
                self.require(BookingStatus::Confirmed, name)?;
                self.status = BookingStatus::Completed;
            }
            BookingAction::SettleRefund { outcome } => {
                if outcome == RefundStatus::Pending {
                    return Err(BookingError::Validation("a refund can only settle as processed or failed".into()));
                }
                let refund_pending =
                    matches!(&self.cancellation, Some(c) if c.refund_status == RefundStatus::Pending);
                if !refund_pending {
                    return Err(self.invalid(name));
                }
                if let Some(cancellation) = self.cancellation.as_mut() {
                    cancellation.refund_status = outcome;
                    if outcome == RefundStatus::Processed && !cancellation.refund_amount.is_zero() {
                        self.payment.status = PaymentStatus::Refunded;
                    }
                }
            }
        }

        info!(booking = %self.booking_number, action = name, status = ?self.status, "Booking transitioned");
        debug_assert!(self.invariants_hold());
        Ok(self.clone())
    }
}

impl Booking {
    fn require(&self, expected: BookingStatus, action: &'static str) -> Result<(), BookingError> {
        if self.status == expected {
            Ok(())
        } else {
            Err(self.invalid(action))
        }
    }

    fn invalid(&self, action: &'static str) -> BookingError {
        BookingError::InvalidTransition {
            booking: self.booking_number.clone(),
            from: self.status,
            action,
        }
    }

    fn not_cancellable(&self, reason: String) -> BookingError {
        BookingError::BookingNotCancellable {
            booking: self.booking_number.clone(),
            reason,
        }
    }
}
