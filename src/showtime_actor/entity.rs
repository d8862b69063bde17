use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::actions::{Availability, Reservation, ShowtimeAction, ShowtimeActionResult};
use super::error::ReservationError;
use crate::actor_framework::Entity;
use crate::domain::{
    BookedSeat, BookingNumber, ClassCounts, SeatClass, Seat, Showtime, ShowtimeCreate, ShowtimeId, ShowtimePatch,
    ShowtimeStatus,
};

impl Entity for Showtime {
    type Id = ShowtimeId;
    type CreateParams = ShowtimeCreate;
    type Patch = ShowtimePatch;
    type Action = ShowtimeAction;
    type ActionResult = ShowtimeActionResult;
    type Error = ReservationError;

    fn id(&self) -> &ShowtimeId {
        &self.id
    }

    /// Schedules a showtime with every seat available.
    fn from_create_params(id: ShowtimeId, params: ShowtimeCreate) -> Result<Self, ReservationError> {
        if params.hall.trim().is_empty() {
            return Err(ReservationError::Validation("hall is required".into()));
        }
        if params.capacity.total() == 0 {
            return Err(ReservationError::Validation("capacity must include at least one seat".into()));
        }
        Ok(Self {
            id,
            movie_id: params.movie_id,
            theater_id: params.theater_id,
            hall: params.hall,
            date: params.date,
            start_time: params.start_time,
            end_time: params.end_time,
            capacity: params.capacity,
            available: params.capacity,
            prices: params.prices,
            booked_seats: Vec::new(),
            status: ShowtimeStatus::Scheduled,
            version: 0,
        })
    }

    /// Applies catalog changes. A retired showtime cannot be put back on sale.
    fn on_update(&mut self, patch: ShowtimePatch) -> Result<(), ReservationError> {
        if let Some(status) = patch.status {
            if self.status.is_retired() && status != self.status {
                return Err(ReservationError::Validation(format!(
                    "showtime is {:?} and cannot move to {:?}",
                    self.status, status
                )));
            }
            self.status = status;
        }
        if let Some(prices) = patch.prices {
            self.prices = prices;
        }
        Ok(())
    }

    /// Refuses to drop a seat map that still references bookings.
    fn on_delete(&self) -> Result<(), ReservationError> {
        if self.booked_seats.is_empty() {
            Ok(())
        } else {
            Err(ReservationError::Validation(format!(
                "showtime still has {} booked seats",
                self.booked_seats.len()
            )))
        }
    }

    /// Evaluates the action's predicate against the current seat map and, only
    /// if it holds, applies the whole mutation. Failing actions change nothing.
    fn handle_action(&mut self, action: ShowtimeAction) -> Result<ShowtimeActionResult, ReservationError> {
        match action {
            ShowtimeAction::BookSeat { seat, booking, observed_version, reserved_at } => self
                .book(vec![seat], booking, observed_version, reserved_at)
                .map(ShowtimeActionResult::BookSeat),
            ShowtimeAction::BookSeats { seats, booking, observed_version, reserved_at } => self
                .book(seats, booking, observed_version, reserved_at)
                .map(ShowtimeActionResult::BookSeats),
            ShowtimeAction::ReleaseSeat { row, number, booking } => self
                .release(&row, number, booking.as_ref())
                .map(ShowtimeActionResult::ReleaseSeat),
            ShowtimeAction::Availability => Ok(ShowtimeActionResult::Availability(Availability {
                capacity: self.capacity,
                available: self.available,
                version: self.version,
            })),
        }
    }
}

impl Showtime {
    fn book(
        &mut self,
        seats: Vec<Seat>,
        booking: BookingNumber,
        observed_version: Option<u64>,
        reserved_at: DateTime<Utc>,
    ) -> Result<Reservation, ReservationError> {
        if self.status.is_retired() {
            return Err(ReservationError::ShowtimeClosed { id: self.id, status: self.status });
        }
        if seats.is_empty() {
            return Err(ReservationError::Validation("no seats requested".into()));
        }

        let mut wanted = ClassCounts::default();
        for (i, seat) in seats.iter().enumerate() {
            if seat.row.is_empty() || seat.number == 0 {
                return Err(ReservationError::Validation(format!("invalid seat position {}{}", seat.row, seat.number)));
            }
            if seats[..i].iter().any(|s| s.same_position(&seat.row, seat.number)) {
                return Err(ReservationError::DuplicateSeat { row: seat.row.clone(), number: seat.number });
            }
            if self.is_booked(&seat.row, seat.number) {
                return Err(self.taken(seat, observed_version));
            }
            *wanted.get_mut(seat.class) += 1;
        }
        if let Some(class) = SeatClass::ALL
            .into_iter()
            .find(|class| wanted.get(*class) > self.available.get(*class))
        {
            warn!(showtime_id = %self.id, %class, "Seat class sold out");
            return Err(ReservationError::InventoryExhausted { class });
        }

        // Predicate holds for every seat: apply all of them.
        let version = self.version + 1;
        let booked: Vec<BookedSeat> = seats
            .into_iter()
            .map(|seat| BookedSeat {
                row: seat.row,
                number: seat.number,
                class: seat.class,
                booking: booking.clone(),
                reserved_at,
                booked_at_version: version,
            })
            .collect();
        for seat in &booked {
            *self.available.get_mut(seat.class) -= 1;
        }
        self.booked_seats.extend(booked.iter().cloned());
        self.version = version;

        info!(
            showtime_id = %self.id,
            booking = %booking,
            seats = booked.len(),
            version = self.version,
            "Seats reserved"
        );
        debug_assert!(self.invariants_hold());
        Ok(self.reservation(booked))
    }

    fn release(
        &mut self,
        row: &str,
        number: u32,
        booking: Option<&BookingNumber>,
    ) -> Result<Reservation, ReservationError> {
        let position = self.booked_seats.iter().position(|seat| {
            seat.row == row && seat.number == number && booking.map_or(true, |b| &seat.booking == b)
        });
        let Some(index) = position else {
            debug!(showtime_id = %self.id, row, number, "Release found no matching seat");
            return Err(ReservationError::SeatNotFound { row: row.to_string(), number });
        };

        let released = self.booked_seats.remove(index);
        *self.available.get_mut(released.class) += 1;
        self.version += 1;

        info!(
            showtime_id = %self.id,
            booking = %released.booking,
            row,
            number,
            version = self.version,
            "Seat released"
        );
        debug_assert!(self.invariants_hold());
        Ok(self.reservation(vec![released]))
    }

    /// A seat that was still free at the caller's observed version was lost to
    /// a concurrent booking; one already booked back then is simply unavailable.
    fn taken(&self, seat: &Seat, observed_version: Option<u64>) -> ReservationError {
        let booked_at = self
            .booked_seats
            .iter()
            .find(|s| seat.same_position(&s.row, s.number))
            .map(|s| s.booked_at_version);
        match (observed_version, booked_at) {
            (Some(observed), Some(booked_at)) if observed < booked_at => ReservationError::ConcurrentConflict {
                row: seat.row.clone(),
                number: seat.number,
                observed,
                current: self.version,
            },
            _ => ReservationError::SeatUnavailable { row: seat.row.clone(), number: seat.number },
        }
    }

    fn reservation(&self, seats: Vec<BookedSeat>) -> Reservation {
        Reservation {
            showtime_id: self.id,
            seats,
            available: self.available,
            prices: self.prices,
            version: self.version,
        }
    }
}
