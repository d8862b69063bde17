//! The reservation engine: seat-map mutations applied as single actor messages.

mod actions;
pub mod entity;
pub mod error;

pub use actions::*;
pub use error::*;
