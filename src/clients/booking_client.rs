use chrono::Duration;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::ShowtimeClient;
use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::booking_actor::{BookingAction, BookingError};
use crate::clock::Clock;
use crate::domain::{
    Booking, BookingCreate, BookingNumber, BookingStatus, CancellationActor, Payment, PaymentStatus, RefundStatus,
    Seat, Showtime, ShowtimeId, TicketDraft, UserId,
};
use crate::identifiers::BookingNumberGenerator;
use crate::retry::RetryPolicy;
use crate::showtime_actor::ReservationError;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Seats freed because their booking is gone, cancelled or expired
    pub released_seats: usize,
    /// Active bookings with at least one ticket missing from the seat map
    pub bookings_missing_seats: Vec<BookingNumber>,
}

/// Booking lifecycle over the booking and showtime actors.
///
/// Seats and bookings live in different actors, so nothing here is a single
/// atomic step. The order is always: reserve seats, then record the booking;
/// transition the booking, then release its seats. A crash between the two
/// halves leaves seats held by a booking that no longer needs them, which
/// [`BookingClient::reconcile`] finds and frees.
#[derive(Clone)]
pub struct BookingClient {
    inner: ResourceClient<Booking>,
    retry: RetryPolicy,
    showtimes: ShowtimeClient,
    numbers: Arc<BookingNumberGenerator>,
    clock: Arc<dyn Clock>,
    hold_window: Duration,
}

impl_client_methods!(BookingClient, Booking, BookingNumber, BookingError::NotFound, booking);

impl BookingClient {
    pub fn new(
        inner: ResourceClient<Booking>,
        showtimes: ShowtimeClient,
        numbers: Arc<BookingNumberGenerator>,
        clock: Arc<dyn Clock>,
        hold_window: Duration,
    ) -> Self {
        Self {
            inner,
            retry: RetryPolicy::default(),
            showtimes,
            numbers,
            clock,
            hold_window,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reserves `seats` and records a pending booking for them.
    ///
    /// Prices are the ones the reservation step saw, so a price change racing
    /// with the booking cannot split the two. If the booking cannot be stored,
    /// the reserved seats are released before the error is returned.
    #[instrument(skip(self, seats, payment), fields(showtime_id = %showtime_id, seats = seats.len()))]
    pub async fn create_booking(
        &self,
        user_id: UserId,
        showtime_id: ShowtimeId,
        seats: Vec<Seat>,
        payment: Payment,
    ) -> Result<Booking, BookingError> {
        if payment.status != PaymentStatus::Pending {
            return Err(BookingError::Validation("payment must be pending when booking".into()));
        }
        let now = self.clock.now();
        let hold_expires_at = now
            .checked_add_signed(self.hold_window)
            .ok_or_else(|| BookingError::Validation(format!("hold window {} is out of range", self.hold_window)))?;

        let showtime = self
            .showtimes
            .get_showtime(showtime_id)
            .await?
            .ok_or(ReservationError::ShowtimeNotFound(showtime_id))?;

        let booking_number = self.numbers.next_booking_number();
        let reservation = self
            .showtimes
            .reserve_seats(showtime_id, seats.clone(), booking_number.clone())
            .await?;
        let tickets: Vec<TicketDraft> = seats
            .iter()
            .map(|seat| TicketDraft {
                seat: seat.clone(),
                price: reservation.prices.get(seat.class),
            })
            .collect();

        let params = BookingCreate {
            user_id,
            showtime_id,
            movie_id: showtime.movie_id.clone(),
            theater_id: showtime.theater_id.clone(),
            tickets,
            payment,
            show_date: showtime.date,
            show_time: showtime.start_time,
            created_at: now,
            hold_expires_at,
        };

        match self.inner.insert(booking_number.clone(), params).await {
            Ok(booking) => {
                info!(booking = %booking.booking_number, total = %booking.total_amount, "Booking created");
                Ok(booking)
            }
            Err(e) => {
                if e.is_transient() {
                    // The insert may have been applied before the response was lost.
                    if let Ok(Some(booking)) = self.get_booking(booking_number.clone()).await {
                        return Ok(booking);
                    }
                }
                error!(booking = %booking_number, error = %e, "Failed to store booking, releasing its seats");
                if let Err((pending, source)) = self.release_seats(showtime_id, &booking_number, &seats).await {
                    error!(booking = %booking_number, pending, error = %source, "Seats left for reconciliation");
                }
                Err(e)
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn confirm_booking(
        &self,
        id: BookingNumber,
        transaction_id: Option<String>,
    ) -> Result<Booking, BookingError> {
        self.transition(id, BookingAction::ConfirmPayment { transaction_id }).await
    }

    /// Records a failed payment and expires the booking straight away.
    #[instrument(skip(self))]
    pub async fn fail_payment(&self, id: BookingNumber, transaction_id: Option<String>) -> Result<Booking, BookingError> {
        self.transition(id.clone(), BookingAction::FailPayment { transaction_id })
            .await?;
        self.expire_booking(id).await
    }

    #[instrument(skip(self))]
    pub async fn cancel_booking(&self, id: BookingNumber, actor: CancellationActor) -> Result<Booking, BookingError> {
        let now = self.clock.now();
        let booking = self.transition(id, BookingAction::Cancel { actor, now }).await?;
        self.finish_release(booking).await
    }

    #[instrument(skip(self))]
    pub async fn expire_booking(&self, id: BookingNumber) -> Result<Booking, BookingError> {
        let now = self.clock.now();
        let booking = self.transition(id, BookingAction::Expire { now }).await?;
        self.finish_release(booking).await
    }

    #[instrument(skip(self))]
    pub async fn complete_booking(&self, id: BookingNumber) -> Result<Booking, BookingError> {
        self.transition(id, BookingAction::Complete).await
    }

    #[instrument(skip(self))]
    pub async fn settle_refund(&self, id: BookingNumber, outcome: RefundStatus) -> Result<Booking, BookingError> {
        self.transition(id, BookingAction::SettleRefund { outcome }).await
    }

    /// Expires every pending booking whose hold window has run out.
    ///
    /// Returns the bookings this sweep moved to `expired`. A booking confirmed
    /// or cancelled while the sweep ran is skipped.
    #[instrument(skip(self))]
    pub async fn expire_stale(&self) -> Result<Vec<BookingNumber>, BookingError> {
        let now = self.clock.now();
        let stale: Vec<BookingNumber> = self
            .list_bookings()
            .await?
            .into_iter()
            .filter(|b| b.status == BookingStatus::Pending && b.hold_expires_at <= now)
            .map(|b| b.booking_number)
            .collect();

        let mut expired = Vec::with_capacity(stale.len());
        for id in stale {
            match self.expire_booking(id.clone()).await {
                Ok(_) => expired.push(id),
                Err(BookingError::InvalidTransition { from, .. }) => {
                    debug!(booking = %id, ?from, "Booking left pending before the sweep reached it");
                }
                Err(e @ BookingError::ReleaseIncomplete { .. }) => {
                    warn!(booking = %id, error = %e, "Expired with seats still held");
                    expired.push(id);
                }
                Err(e) => warn!(booking = %id, error = %e, "Failed to expire booking"),
            }
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "Expired stale bookings");
        }
        Ok(expired)
    }

    /// Brings the seat maps back in line with booking states.
    ///
    /// Releases seats whose booking is cancelled or expired. Seats tagged with a
    /// booking that does not exist are released only once they are older than
    /// the hold window, since creation reserves seats before storing the
    /// booking. Active bookings whose seats are missing are reported, not fixed.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> Result<ReconcileReport, BookingError> {
        let bookings: HashMap<BookingNumber, Booking> = self
            .list_bookings()
            .await?
            .into_iter()
            .map(|b| (b.booking_number.clone(), b))
            .collect();
        let showtimes = self.showtimes.list_showtimes().await?;
        let now = self.clock.now();
        let mut report = ReconcileReport::default();

        for showtime in &showtimes {
            for seat in &showtime.booked_seats {
                let stale = match bookings.get(&seat.booking) {
                    Some(booking) => !booking.status.holds_seats(),
                    None => now - seat.reserved_at > self.hold_window,
                };
                if !stale {
                    continue;
                }
                match self
                    .showtimes
                    .release_booking_seat(showtime.id, &seat.seat(), &seat.booking)
                    .await
                {
                    Ok(_) => {
                        info!(showtime_id = %showtime.id, booking = %seat.booking, row = %seat.row, number = seat.number, "Reconciled stale seat");
                        report.released_seats += 1;
                    }
                    Err(ReservationError::SeatNotFound { .. } | ReservationError::ShowtimeNotFound(_)) => {}
                    Err(e) => {
                        warn!(showtime_id = %showtime.id, booking = %seat.booking, error = %e, "Failed to release stale seat");
                    }
                }
            }
        }

        let by_id: HashMap<ShowtimeId, &Showtime> = showtimes.iter().map(|s| (s.id, s)).collect();
        for booking in bookings.values().filter(|b| b.status.holds_seats()) {
            let intact = by_id.get(&booking.showtime_id).is_some_and(|showtime| {
                booking.seats().all(|seat| {
                    showtime
                        .seats_of(&booking.booking_number)
                        .any(|held| held.row == seat.row && held.number == seat.number)
                })
            });
            if !intact {
                error!(booking = %booking.booking_number, status = ?booking.status, "Booking is missing seats");
                report.bookings_missing_seats.push(booking.booking_number.clone());
            }
        }
        report.bookings_missing_seats.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        debug!(?report, "Reconciliation finished");
        Ok(report)
    }

    pub async fn shutdown(&self) -> Result<(), BookingError> {
        self.inner.shutdown().await
    }

    fn owner(&self, _id: &BookingNumber) -> &ResourceClient<Booking> {
        &self.inner
    }

    fn actors(&self) -> &[ResourceClient<Booking>] {
        std::slice::from_ref(&self.inner)
    }

    async fn transition(&self, id: BookingNumber, action: BookingAction) -> Result<Booking, BookingError> {
        debug!(action = action.name(), "Sending request");
        match self.inner.perform_action(id.clone(), action).await {
            Err(BookingError::Framework(FrameworkError::NotFound(_))) => Err(BookingError::NotFound(id)),
            result => result,
        }
    }

    /// Releases the seats of a booking that has just left a seat-holding state.
    async fn finish_release(&self, booking: Booking) -> Result<Booking, BookingError> {
        let seats: Vec<Seat> = booking.seats().cloned().collect();
        let result = self.release_seats(booking.showtime_id, &booking.booking_number, &seats).await;
        match result {
            Ok(released) => {
                info!(booking = %booking.booking_number, status = ?booking.status, released, "Seats released");
                Ok(booking)
            }
            Err((pending, source)) => {
                error!(booking = %booking.booking_number, pending, error = %source, "Seat release incomplete");
                Err(BookingError::ReleaseIncomplete {
                    booking: booking.booking_number,
                    status: booking.status,
                    pending,
                    source,
                })
            }
        }
    }

    /// Releases each seat still tagged with `booking`. A seat that is already
    /// free counts as released. On failure returns how many seats remain held
    /// and the first error seen.
    async fn release_seats(
        &self,
        showtime_id: ShowtimeId,
        booking: &BookingNumber,
        seats: &[Seat],
    ) -> Result<usize, (usize, ReservationError)> {
        let mut released = 0;
        let mut failed: Option<(usize, ReservationError)> = None;
        for seat in seats {
            match self.showtimes.release_booking_seat(showtime_id, seat, booking).await {
                Ok(_) => released += 1,
                Err(ReservationError::SeatNotFound { .. } | ReservationError::ShowtimeNotFound(_)) => {
                    debug!(booking = %booking, row = %seat.row, number = seat.number, "Seat already free");
                }
                Err(e) => {
                    warn!(booking = %booking, row = %seat.row, number = seat.number, error = %e, "Seat release failed");
                    failed.get_or_insert_with(|| (0, e)).0 += 1;
                }
            }
        }
        match failed {
            None => Ok(released),
            Some(failure) => Err(failure),
        }
    }
}
