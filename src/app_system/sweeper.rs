use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, instrument, warn};

use crate::clients::BookingClient;

/// Periodically expires stale holds and reconciles seat maps until told to stop.
#[instrument(name = "booking_sweeper", skip(bookings, shutdown))]
pub async fn run_sweeper(bookings: BookingClient, every: Duration, mut shutdown: watch::Receiver<bool>) {
    info!("Sweeper starting");
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; skip it so a fresh system is left alone.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => sweep(&bookings).await,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    info!("Sweeper stopped");
}

/// One pass: expire first so reconciliation sees the freshly expired bookings.
pub async fn sweep(bookings: &BookingClient) {
    match bookings.expire_stale().await {
        Ok(expired) if !expired.is_empty() => info!(count = expired.len(), "Sweep expired bookings"),
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Expiry sweep failed"),
    }
    match bookings.reconcile().await {
        Ok(report) if report.released_seats > 0 || !report.bookings_missing_seats.is_empty() => {
            info!(
                released = report.released_seats,
                missing = report.bookings_missing_seats.len(),
                "Sweep reconciled seat maps"
            );
        }
        Ok(_) => {}
        Err(e) => warn!(error = %e, "Reconciliation failed"),
    }
}
