//! Typed clients over the actor mailboxes.

#[macro_use]
mod macros;
pub mod booking_client;
pub mod showtime_client;

pub use booking_client::*;
pub use showtime_client::*;
