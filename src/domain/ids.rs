use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a scheduled screening.
///
/// Time-ordered (UUID v7) so ids sort by creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShowtimeId(Uuid);

impl ShowtimeId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Picks one of `shards` owners for this showtime. Stable for the id's lifetime.
    ///
    /// Uses the random tail of the UUID, so consecutive ids spread evenly.
    pub fn shard(&self, shards: usize) -> usize {
        let shards = shards.max(1) as u128;
        // The remainder is below `shards`, which came from a usize.
        (self.0.as_u128() % shards) as usize
    }
}

impl Default for ShowtimeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ShowtimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Human-legible booking number, also the booking's identity.
///
/// Produced by [`crate::identifiers::BookingNumberGenerator`].
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookingNumber(String);

impl BookingNumber {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ticket identifiers are derived from the booking number and a 1-based sequence.
    pub fn ticket_id(&self, sequence: usize) -> String {
        format!("{}-T{:02}", self.0, sequence)
    }
}

impl fmt::Display for BookingNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! external_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

external_id!(
    /// User identity as issued by the auth collaborator. Never validated here.
    UserId
);
external_id!(
    /// Catalog movie reference, denormalized onto bookings for display.
    MovieId
);
external_id!(
    /// Catalog theater (venue) reference.
    TheaterId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shard_is_stable_and_in_range() {
        let ids: Vec<ShowtimeId> = (0..64).map(|_| ShowtimeId::new()).collect();
        for id in &ids {
            assert!(id.shard(4) < 4);
            assert_eq!(id.shard(4), id.shard(4));
            assert_eq!(id.shard(1), 0);
            assert_eq!(id.shard(0), 0);
        }
        let used: std::collections::HashSet<usize> = ids.iter().map(|id| id.shard(4)).collect();
        assert!(used.len() > 1, "64 ids all landed on one shard");
    }
}
