//! System orchestration, startup, and shutdown logic.

pub mod booking_system;
pub mod sweeper;
pub mod tracing;

pub use booking_system::*;
pub use sweeper::*;
pub use self::tracing::*;
