//! Booking number generation.
//!
//! Numbers look like `BK261016000042A3F9`: prefix, `YYMMDD` of issue, a 6-digit
//! sequence taken from an atomic counter, and a 4-hex node tag. The counter makes
//! numbers unique within a generator no matter how many tasks draw from it; the
//! node tag, drawn once per generator, separates generators in different
//! processes that would otherwise repeat each other's sequences.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::domain::BookingNumber;

const PREFIX: &str = "BK";
const SEQUENCE_MODULUS: u64 = 1_000_000;

pub struct BookingNumberGenerator {
    sequence: AtomicU64,
    node: u16,
    clock: Arc<dyn Clock>,
}

impl BookingNumberGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let bytes = Uuid::new_v4().into_bytes();
        Self::with_node(clock, u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn with_node(clock: Arc<dyn Clock>, node: u16) -> Self {
        Self {
            sequence: AtomicU64::new(1),
            node,
            clock,
        }
    }

    pub fn next_booking_number(&self) -> BookingNumber {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
        let date = self.clock.now().format("%y%m%d");
        // Past a million numbers per generator, the overflow bumps the node tag so
        // wrapped sequences do not collide with earlier ones.
        let node = self.node.wrapping_add(u16::try_from(sequence / SEQUENCE_MODULUS).unwrap_or(u16::MAX));
        BookingNumber::new(format!(
            "{PREFIX}{date}{:06}{node:04X}",
            sequence % SEQUENCE_MODULUS
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;

    fn clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()))
    }

    #[test]
    fn format_is_legible() {
        let generator = BookingNumberGenerator::with_node(clock(), 0xA3F9);
        assert_eq!(generator.next_booking_number().as_str(), "BK261016000001A3F9");
        assert_eq!(generator.next_booking_number().as_str(), "BK261016000002A3F9");
    }

    #[test]
    fn ticket_ids_derive_from_booking_number() {
        let number = BookingNumberGenerator::with_node(clock(), 1).next_booking_number();
        assert_eq!(number.ticket_id(1), format!("{number}-T01"));
        assert_eq!(number.ticket_id(12), format!("{number}-T12"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_generation_is_unique() {
        let generator = Arc::new(BookingNumberGenerator::new(clock()));

        let tasks: Vec<_> = (0..100)
            .map(|_| {
                let generator = Arc::clone(&generator);
                tokio::spawn(async move {
                    (0..100).map(|_| generator.next_booking_number()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for task in tasks {
            for number in task.await.unwrap() {
                assert!(seen.insert(number), "duplicate booking number");
            }
        }
        assert_eq!(seen.len(), 10_000);
    }
}
