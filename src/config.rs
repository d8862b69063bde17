//! Configuration management for the booking system.
//!
//! Loads configuration from environment variables (and a `.env` file, when
//! present) with sensible defaults.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::retry::RetryPolicy;

/// Longest hold a pending booking may keep its seats for.
pub const MAX_HOLD_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub reservation: ReservationConfig,
    pub actors: ActorConfig,
    pub retry: RetryPolicy,
    pub log: LogConfig,
}

/// Hold window and sweeper cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationConfig {
    /// How long a pending booking may stay unpaid before it expires
    pub hold_window: Duration,
    /// How often the expiry and reconciliation sweep runs
    pub sweep_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorConfig {
    /// Mailbox capacity of each actor
    pub mailbox_size: usize,
    /// Upper bound on a single request/response exchange
    pub request_timeout: Duration,
    /// Number of showtime actors; each showtime lives in exactly one
    pub showtime_shards: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` overrides it
    pub filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reservation: ReservationConfig {
                hold_window: Duration::from_secs(15 * 60),
                sweep_interval: Duration::from_secs(30),
            },
            actors: ActorConfig {
                mailbox_size: 100,
                request_timeout: Duration::from_secs(5),
                showtime_shards: 4,
            },
            retry: RetryPolicy::default(),
            log: LogConfig {
                filter: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Environment Variables
    ///
    /// - `BOOKING_HOLD_WINDOW_SECS` (default 900, at most 86400)
    /// - `BOOKING_SWEEP_INTERVAL_SECS` (default 30)
    /// - `ACTOR_MAILBOX_SIZE` (default 100)
    /// - `ACTOR_REQUEST_TIMEOUT_MS` (default 5000)
    /// - `ACTOR_SHOWTIME_SHARDS` (default 4)
    /// - `RETRY_MAX_ATTEMPTS` (default 3)
    /// - `RETRY_INITIAL_DELAY_MS` (default 50)
    /// - `RETRY_MAX_DELAY_MS` (default 1000)
    /// - `LOG_FILTER` (default `info`)
    pub fn from_env() -> Result<Self, ConfigError> {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let hold_window = secs(&lookup, "BOOKING_HOLD_WINDOW_SECS", defaults.reservation.hold_window)?;
        let sweep_interval = secs(&lookup, "BOOKING_SWEEP_INTERVAL_SECS", defaults.reservation.sweep_interval)?;
        let mailbox_size: usize = parse(&lookup, "ACTOR_MAILBOX_SIZE", defaults.actors.mailbox_size)?;
        let request_timeout = millis(&lookup, "ACTOR_REQUEST_TIMEOUT_MS", defaults.actors.request_timeout)?;
        let showtime_shards: usize = parse(&lookup, "ACTOR_SHOWTIME_SHARDS", defaults.actors.showtime_shards)?;
        let max_retries = parse(&lookup, "RETRY_MAX_ATTEMPTS", defaults.retry.max_retries)?;
        let initial_delay = millis(&lookup, "RETRY_INITIAL_DELAY_MS", defaults.retry.initial_delay)?;
        let max_delay = millis(&lookup, "RETRY_MAX_DELAY_MS", defaults.retry.max_delay)?;
        let filter = lookup("LOG_FILTER").unwrap_or(defaults.log.filter);

        if hold_window.is_zero() {
            return Err(invalid("BOOKING_HOLD_WINDOW_SECS", "0", "hold window must be positive"));
        }
        if hold_window > MAX_HOLD_WINDOW {
            return Err(invalid(
                "BOOKING_HOLD_WINDOW_SECS",
                &hold_window.as_secs().to_string(),
                "hold window must not exceed one day",
            ));
        }
        if sweep_interval.is_zero() {
            return Err(invalid("BOOKING_SWEEP_INTERVAL_SECS", "0", "sweep interval must be positive"));
        }
        if mailbox_size == 0 {
            return Err(invalid("ACTOR_MAILBOX_SIZE", "0", "mailbox must hold at least one request"));
        }
        if request_timeout.is_zero() {
            return Err(invalid("ACTOR_REQUEST_TIMEOUT_MS", "0", "timeout must be positive"));
        }
        if showtime_shards == 0 {
            return Err(invalid("ACTOR_SHOWTIME_SHARDS", "0", "at least one showtime actor is required"));
        }

        Ok(Self {
            reservation: ReservationConfig {
                hold_window,
                sweep_interval,
            },
            actors: ActorConfig {
                mailbox_size,
                request_timeout,
                showtime_shards,
            },
            retry: RetryPolicy {
                max_retries,
                initial_delay,
                max_delay,
                ..defaults.retry
            },
            log: LogConfig { filter },
        })
    }

    /// The hold window as a calendar duration.
    ///
    /// Fails for a window over [`MAX_HOLD_WINDOW`], which `from_lookup` never
    /// produces but a hand-built `Config` can.
    pub fn hold_window(&self) -> Result<chrono::Duration, ConfigError> {
        let window = self.reservation.hold_window;
        let too_long = || {
            invalid(
                "BOOKING_HOLD_WINDOW_SECS",
                &window.as_secs().to_string(),
                "hold window must not exceed one day",
            )
        };
        if window > MAX_HOLD_WINDOW {
            return Err(too_long());
        }
        chrono::Duration::from_std(window).map_err(|_| too_long())
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(key, &raw, &e.to_string())),
        None => Ok(default),
    }
}

fn secs(lookup: &impl Fn(&str) -> Option<String>, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse(lookup, key, default.as_secs()).map(Duration::from_secs)
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse(lookup, key, default_ms).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.hold_window(), Ok(chrono::Duration::minutes(15)));
        assert_eq!(config.actors.showtime_shards, 4);
    }

    #[test]
    fn overrides_are_parsed() {
        let config = Config::from_lookup(lookup_from(&[
            ("BOOKING_HOLD_WINDOW_SECS", "600"),
            ("ACTOR_REQUEST_TIMEOUT_MS", "250"),
            ("RETRY_MAX_ATTEMPTS", "5"),
            ("LOG_FILTER", "showtime_booking=debug"),
        ]))
        .unwrap();
        assert_eq!(config.reservation.hold_window, Duration::from_secs(600));
        assert_eq!(config.actors.request_timeout, Duration::from_millis(250));
        assert_eq!(config.retry.max_retries, 5);
        assert_eq!(config.log.filter, "showtime_booking=debug");
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = Config::from_lookup(lookup_from(&[("ACTOR_MAILBOX_SIZE", "lots")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ACTOR_MAILBOX_SIZE", .. }));

        let err = Config::from_lookup(lookup_from(&[("BOOKING_HOLD_WINDOW_SECS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "BOOKING_HOLD_WINDOW_SECS", .. }));

        let err = Config::from_lookup(lookup_from(&[("ACTOR_SHOWTIME_SHARDS", "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "ACTOR_SHOWTIME_SHARDS", .. }));
    }

    #[test]
    fn oversized_hold_windows_are_rejected_not_clamped() {
        for raw in ["86401", "10000000000000", "100000000000000000"] {
            let err = Config::from_lookup(lookup_from(&[("BOOKING_HOLD_WINDOW_SECS", raw)])).unwrap_err();
            assert!(
                matches!(&err, ConfigError::Invalid { key: "BOOKING_HOLD_WINDOW_SECS", value, .. } if value == raw),
                "{raw}: {err}"
            );
        }

        let config = Config::from_lookup(lookup_from(&[("BOOKING_HOLD_WINDOW_SECS", "86400")])).unwrap();
        assert_eq!(config.hold_window(), Ok(chrono::Duration::days(1)));
    }

    #[test]
    fn hand_built_oversized_window_is_an_error() {
        let mut config = Config::default();
        config.reservation.hold_window = Duration::from_secs(100_000_000_000_000_000);
        assert!(matches!(config.hold_window(), Err(ConfigError::Invalid { .. })));
    }
}
