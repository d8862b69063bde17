//! Seat reservation and booking lifecycle for timed cinema inventory.
//!
//! Each showtime's seat map and each booking is owned by an actor
//! ([`actor_framework::ResourceActor`]). Seat claims are predicate-guarded
//! actions applied inside the showtime actor, so two requests for the same seat
//! can never both succeed. [`clients::BookingClient`] coordinates the two
//! aggregates and [`app_system::BookingSystem`] wires everything together.

pub mod actor_framework;
pub mod app_system;
pub mod booking_actor;
pub mod clients;
pub mod clock;
pub mod config;
pub mod domain;
pub mod identifiers;
pub mod policy;
pub mod retry;
pub mod showtime_actor;

#[cfg(test)]
mod mock_framework;
