use std::sync::Arc;
use tracing::{debug, instrument};

use crate::actor_framework::{FrameworkError, ResourceClient};
use crate::clock::Clock;
use crate::domain::{BookingNumber, Seat, Showtime, ShowtimeCreate, ShowtimeId, ShowtimePatch};
use crate::retry::{retry_idempotent, RetryPolicy};
use crate::showtime_actor::{Availability, Reservation, ReservationError, ShowtimeAction, ShowtimeActionResult};

/// Client for the reservation engine.
///
/// Showtimes are spread over one or more actors by id, so requests for
/// different showtimes do not queue behind each other. Each seat map still
/// lives in exactly one actor. Reservation attempts are sent exactly once.
/// Releases and reads are idempotent and retried on transient failures.
#[derive(Clone)]
pub struct ShowtimeClient {
    /// Never empty.
    shards: Vec<ResourceClient<Showtime>>,
    retry: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl_client_methods!(ShowtimeClient, Showtime, ShowtimeId, ReservationError::ShowtimeNotFound, showtime);

impl ShowtimeClient {
    pub fn new(inner: ResourceClient<Showtime>, clock: Arc<dyn Clock>) -> Self {
        Self {
            shards: vec![inner],
            retry: RetryPolicy::default(),
            clock,
        }
    }

    /// Adds further showtime actors. Must be done before any showtime is scheduled.
    pub fn with_shards(mut self, more: impl IntoIterator<Item = ResourceClient<Showtime>>) -> Self {
        self.shards.extend(more);
        self
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[instrument(skip(self))]
    pub async fn schedule_showtime(&self, params: ShowtimeCreate) -> Result<ShowtimeId, ReservationError> {
        // The id is picked here so it can decide which actor owns the showtime.
        let id = ShowtimeId::new();
        debug!(showtime_id = %id, shard = id.shard(self.shards.len()), "Sending request");
        self.owner(&id).insert(id, params).await.map(|showtime| showtime.id)
    }

    #[instrument(skip(self))]
    pub async fn update_showtime(&self, id: ShowtimeId, patch: ShowtimePatch) -> Result<Showtime, ReservationError> {
        debug!("Sending request");
        self.owner(&id).update(id, patch).await.map_err(|e| not_found(e, id))
    }

    /// Books one seat for `booking` against the current seat map.
    #[instrument(skip(self), fields(showtime_id = %id, booking = %booking))]
    pub async fn reserve_seat(
        &self,
        id: ShowtimeId,
        seat: Seat,
        booking: BookingNumber,
    ) -> Result<Reservation, ReservationError> {
        self.book(id, vec![seat], booking, None).await
    }

    /// Books one seat, reporting `ConcurrentConflict` when the seat was still
    /// free at `observed_version` and went to someone else since.
    #[instrument(skip(self), fields(showtime_id = %id, booking = %booking))]
    pub async fn reserve_seat_at_version(
        &self,
        id: ShowtimeId,
        seat: Seat,
        booking: BookingNumber,
        observed_version: u64,
    ) -> Result<Reservation, ReservationError> {
        self.book(id, vec![seat], booking, Some(observed_version)).await
    }

    /// Books every seat or none of them.
    #[instrument(skip(self, seats), fields(showtime_id = %id, booking = %booking, seats = seats.len()))]
    pub async fn reserve_seats(
        &self,
        id: ShowtimeId,
        seats: Vec<Seat>,
        booking: BookingNumber,
    ) -> Result<Reservation, ReservationError> {
        self.book(id, seats, booking, None).await
    }

    /// Frees a seat whoever holds it. A seat that is not booked yields `SeatNotFound`.
    #[instrument(skip(self), fields(showtime_id = %id))]
    pub async fn release_seat(&self, id: ShowtimeId, row: String, number: u32) -> Result<Reservation, ReservationError> {
        debug!("Sending request");
        self.release(id, row, number, None).await
    }

    /// Frees a seat only if it still belongs to `booking`.
    #[instrument(skip(self, seat), fields(showtime_id = %id, booking = %booking, row = %seat.row, number = seat.number))]
    pub async fn release_booking_seat(
        &self,
        id: ShowtimeId,
        seat: &Seat,
        booking: &BookingNumber,
    ) -> Result<Reservation, ReservationError> {
        debug!("Sending request");
        self.release(id, seat.row.clone(), seat.number, Some(booking.clone())).await
    }

    #[instrument(skip(self))]
    pub async fn availability(&self, id: ShowtimeId) -> Result<Availability, ReservationError> {
        debug!("Sending request");
        let owner = self.owner(&id);
        let result = retry_idempotent(&self.retry, "availability", || {
            owner.perform_action(id, ShowtimeAction::Availability)
        })
        .await;
        match result.map_err(|e| not_found(e, id))? {
            ShowtimeActionResult::Availability(availability) => Ok(availability),
            _ => Err(FrameworkError::UnexpectedResponse("availability").into()),
        }
    }

    pub async fn shutdown(&self) -> Result<(), ReservationError> {
        for shard in &self.shards {
            shard.shutdown().await?;
        }
        Ok(())
    }

    fn owner(&self, id: &ShowtimeId) -> &ResourceClient<Showtime> {
        &self.shards[id.shard(self.shards.len())]
    }

    fn actors(&self) -> &[ResourceClient<Showtime>] {
        &self.shards
    }

    async fn book(
        &self,
        id: ShowtimeId,
        seats: Vec<Seat>,
        booking: BookingNumber,
        observed_version: Option<u64>,
    ) -> Result<Reservation, ReservationError> {
        debug!("Sending request");
        let reserved_at = self.clock.now();
        let action = match <[Seat; 1]>::try_from(seats) {
            Ok([seat]) => ShowtimeAction::BookSeat { seat, booking, observed_version, reserved_at },
            Err(seats) => ShowtimeAction::BookSeats { seats, booking, observed_version, reserved_at },
        };
        match self.owner(&id).perform_action(id, action).await.map_err(|e| not_found(e, id))? {
            ShowtimeActionResult::BookSeat(reservation) | ShowtimeActionResult::BookSeats(reservation) => Ok(reservation),
            _ => Err(FrameworkError::UnexpectedResponse("book").into()),
        }
    }

    async fn release(
        &self,
        id: ShowtimeId,
        row: String,
        number: u32,
        booking: Option<BookingNumber>,
    ) -> Result<Reservation, ReservationError> {
        let owner = self.owner(&id);
        let result = retry_idempotent(&self.retry, "release_seat", || {
            owner.perform_action(
                id,
                ShowtimeAction::ReleaseSeat { row: row.clone(), number, booking: booking.clone() },
            )
        })
        .await;
        match result.map_err(|e| not_found(e, id))? {
            ShowtimeActionResult::ReleaseSeat(reservation) => Ok(reservation),
            _ => Err(FrameworkError::UnexpectedResponse("release_seat").into()),
        }
    }
}

fn not_found(error: ReservationError, id: ShowtimeId) -> ReservationError {
    match error {
        ReservationError::Framework(FrameworkError::NotFound(_)) => ReservationError::ShowtimeNotFound(id),
        other => other,
    }
}
