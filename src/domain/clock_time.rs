use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid time of day {0:?}, expected HH:MM (24-hour)")]
pub struct InvalidClockTime(pub String);

/// Time of day as persisted on showtimes and bookings: `HH:MM`, 24-hour.
///
/// Parsing accepts a one-digit hour (`9:05`); rendering always pads (`09:05`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    pub fn new(hour: u8, minute: u8) -> Result<Self, InvalidClockTime> {
        if hour > 23 || minute > 59 {
            return Err(InvalidClockTime(format!("{hour}:{minute}")));
        }
        Ok(Self { hour, minute })
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(u32::from(self.hour), u32::from(self.minute), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl FromStr for ClockTime {
    type Err = InvalidClockTime;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidClockTime(s.to_string());
        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if hour.is_empty() || hour.len() > 2 || minute.len() != 2 || !all_digits(hour) || !all_digits(minute) {
            return Err(invalid());
        }
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl TryFrom<String> for ClockTime {
    type Error = InvalidClockTime;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ClockTime> for String {
    fn from(value: ClockTime) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_persisted_formats() {
        for (raw, rendered) in [("00:00", "00:00"), ("9:05", "09:05"), ("19:30", "19:30"), ("23:59", "23:59")] {
            let time: ClockTime = raw.parse().unwrap();
            assert_eq!(time.to_string(), rendered);
        }
    }

    #[test]
    fn rejects_out_of_range_and_malformed() {
        for raw in ["24:00", "12:60", "7:5", "123:00", "12-30", "", ":30", "ab:cd", "+1:30", "12:3x"] {
            assert!(raw.parse::<ClockTime>().is_err(), "{raw} should be rejected");
        }
    }

    #[test]
    fn serializes_as_string() {
        let time: ClockTime = "8:15".parse().unwrap();
        assert_eq!(serde_json::to_string(&time).unwrap(), "\"08:15\"");
        let back: ClockTime = serde_json::from_str("\"08:15\"").unwrap();
        assert_eq!(back, time);
        assert!(serde_json::from_str::<ClockTime>("\"25:00\"").is_err());
    }
}
