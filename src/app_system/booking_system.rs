use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::sweeper::run_sweeper;
use crate::actor_framework::ResourceActor;
use crate::booking_actor::BookingError;
use crate::clients::{BookingClient, ShowtimeClient};
use crate::clock::Clock;
use crate::config::{Config, ConfigError};
use crate::domain::{Booking, BookingNumber, Showtime, ShowtimeId};
use crate::identifiers::BookingNumberGenerator;
use crate::showtime_actor::ReservationError;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to stop actor: {0}")]
    Reservation(#[from] ReservationError),
    #[error("failed to stop actor: {0}")]
    Booking(#[from] BookingError),
    #[error("task {name} failed: {source}")]
    Task {
        name: &'static str,
        source: tokio::task::JoinError,
    },
}

/// The running booking service: both actors, their clients and the sweeper.
///
/// Responsible for starting up actors, wiring them together, and handling shutdown.
pub struct BookingSystem {
    pub booking_client: BookingClient,
    pub showtime_client: ShowtimeClient,
    stop_sweeper: watch::Sender<bool>,
    sweeper: JoinHandle<()>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BookingSystem {
    /// Spawns the showtime actors, the booking actor and the expiry sweeper.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, SystemError> {
        let hold_window = config.hold_window()?;
        let mut handles = Vec::with_capacity(config.actors.showtime_shards + 1);

        let mut spawn_showtime_actor = || {
            let (showtime_actor, showtime_resource_client) = ResourceActor::<Showtime>::new(
                "showtimes",
                config.actors.mailbox_size,
                config.actors.request_timeout,
                ShowtimeId::new,
            );
            handles.push(("showtimes", tokio::spawn(showtime_actor.run())));
            showtime_resource_client
        };
        let first = spawn_showtime_actor();
        let rest: Vec<_> = (1..config.actors.showtime_shards)
            .map(|_| spawn_showtime_actor())
            .collect();
        let showtime_client = ShowtimeClient::new(first, clock.clone())
            .with_shards(rest)
            .with_retry(config.retry.clone());

        let numbers = Arc::new(BookingNumberGenerator::new(clock.clone()));
        let ids = numbers.clone();
        // Bookings are inserted under a number chosen before their seats are
        // reserved; the actor only falls back to this for plain creates.
        let (booking_actor, booking_resource_client) = ResourceActor::<Booking>::new(
            "bookings",
            config.actors.mailbox_size,
            config.actors.request_timeout,
            move || -> BookingNumber { ids.next_booking_number() },
        );
        let booking_client = BookingClient::new(
            booking_resource_client,
            showtime_client.clone(),
            numbers,
            clock,
            hold_window,
        )
        .with_retry(config.retry.clone());
        handles.push(("bookings", tokio::spawn(booking_actor.run())));

        let (stop_sweeper, stop_rx) = watch::channel(false);
        let sweeper = tokio::spawn(run_sweeper(
            booking_client.clone(),
            config.reservation.sweep_interval,
            stop_rx,
        ));

        info!(
            hold_window_secs = config.reservation.hold_window.as_secs(),
            sweep_interval_secs = config.reservation.sweep_interval.as_secs(),
            showtime_shards = showtime_client.shard_count(),
            "Booking system started"
        );

        Ok(Self {
            booking_client,
            showtime_client,
            stop_sweeper,
            sweeper,
            handles,
        })
    }

    /// Stops the sweeper, then every actor, and waits for every task to end.
    ///
    /// Requests already queued in an actor's mailbox are served before it stops.
    pub async fn shutdown(self) -> Result<(), SystemError> {
        info!("Shutting down system...");

        let _ = self.stop_sweeper.send(true);
        self.sweeper
            .await
            .map_err(|source| SystemError::Task { name: "sweeper", source })?;

        self.booking_client.shutdown().await?;
        self.showtime_client.shutdown().await?;

        for (name, handle) in self.handles {
            if let Err(source) = handle.await {
                error!(task = name, error = %source, "Actor task failed");
                return Err(SystemError::Task { name, source });
            }
        }

        info!("System shutdown complete.");
        Ok(())
    }
}
