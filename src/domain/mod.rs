//! Aggregates and value objects shared by the reservation engine and the booking lifecycle.

pub mod booking;
pub mod clock_time;
pub mod ids;
pub mod money;
pub mod seat;
pub mod showtime;

pub use booking::*;
pub use clock_time::*;
pub use ids::*;
pub use money::*;
pub use seat::*;
pub use showtime::*;
