use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{error, info, Instrument};

use showtime_booking::app_system::{setup_tracing, BookingSystem};
use showtime_booking::clock::SystemClock;
use showtime_booking::config::Config;
use showtime_booking::domain::{
    CancellationActor, ClassCounts, ClassPrices, ClockTime, Money, MovieId, Payment, RefundStatus, Seat, SeatClass,
    ShowtimeCreate, TheaterId, UserId,
};

#[tokio::main]
async fn main() -> Result<(), String> {
    let config = Config::from_env().map_err(|e| e.to_string())?;
    setup_tracing(&config.log.filter);

    info!("Starting booking system");
    let system = BookingSystem::start(&config, Arc::new(SystemClock)).map_err(|e| e.to_string())?;

    let show_date = (Utc::now() + Duration::days(2)).date_naive();
    let showtime_id = system
        .showtime_client
        .schedule_showtime(ShowtimeCreate {
            movie_id: MovieId::new("movie-arrival"),
            theater_id: TheaterId::new("theater-downtown"),
            hall: "Hall 3".into(),
            date: show_date,
            start_time: "19:30".parse::<ClockTime>().map_err(|e| format!("{e}"))?,
            end_time: "21:26".parse::<ClockTime>().map_err(|e| format!("{e}"))?,
            capacity: ClassCounts { regular: 40, premium: 10, vip: 4, wheelchair: 2 },
            prices: ClassPrices {
                regular: Money::from_major(12),
                premium: Money::from_major(16),
                vip: Money::from_major(25),
                wheelchair: Money::from_major(12),
            },
        })
        .await
        .map_err(|e| e.to_string())?;
    info!(showtime_id = %showtime_id, date = %show_date, "Showtime scheduled");

    let span = tracing::info_span!("booking_flow");
    let booking = async {
        info!("Reserving seats");
        system
            .booking_client
            .create_booking(
                UserId::new("user-alice"),
                showtime_id,
                vec![Seat::new("F", 7, SeatClass::Premium), Seat::new("F", 8, SeatClass::Premium)],
                Payment::pending("card"),
            )
            .await
    }
    .instrument(span.clone())
    .await
    .map_err(|e| e.to_string())?;
    info!(booking = %booking.booking_number, total = %booking.total_amount, "Booking pending payment");

    // A second customer racing for the same seat loses cleanly.
    match system
        .booking_client
        .create_booking(
            UserId::new("user-bob"),
            showtime_id,
            vec![Seat::new("F", 8, SeatClass::Premium)],
            Payment::pending("wallet"),
        )
        .instrument(span.clone())
        .await
    {
        Ok(other) => error!(booking = %other.booking_number, "Seat was sold twice"),
        Err(e) => info!(error = %e, "Second request for F8 rejected"),
    }

    let flow = async {
        let confirmed = system
            .booking_client
            .confirm_booking(booking.booking_number.clone(), Some("txn-0001".into()))
            .await?;
        info!(booking = %confirmed.booking_number, status = ?confirmed.status, "Payment confirmed");

        let cancelled = system
            .booking_client
            .cancel_booking(booking.booking_number.clone(), CancellationActor::User)
            .await?;
        if let Some(cancellation) = &cancelled.cancellation {
            info!(refund = %cancellation.refund_amount, "Booking cancelled");
        }

        system
            .booking_client
            .settle_refund(booking.booking_number.clone(), RefundStatus::Processed)
            .await
    }
    .instrument(span)
    .await;

    match flow {
        Ok(settled) => info!(booking = %settled.booking_number, payment = ?settled.payment.status, "Refund settled"),
        Err(e) => error!(error = %e, "Booking flow failed"),
    }

    let availability = system
        .showtime_client
        .availability(showtime_id)
        .await
        .map_err(|e| e.to_string())?;
    info!(
        premium_available = availability.available.premium,
        version = availability.version,
        "Final availability"
    );

    system.shutdown().await.map_err(|e| e.to_string())?;

    info!("Application completed successfully");
    Ok(())
}
