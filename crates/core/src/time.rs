//! Wall-clock value types shared by the engine and the HTTP boundary.
//!
//! Times cross the boundary as zero-padded `HH:MM` strings but are carried
//! internally as minutes since midnight, so comparisons are plain integer
//! comparisons.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Last representable minute of the day (23:59).
pub const LAST_MINUTE: u16 = 24 * 60 - 1;

/// Input-shape errors. These are caller bugs or malformed requests, never
/// business-rule rejections.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("invalid time '{0}', expected HH:MM")]
    Time(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Date(String),

    #[error("day of week must be between 0 and 6, got {0}")]
    DayOfWeek(i64),

    #[error("duration must be between 1 and 1440 minutes, got {0}")]
    Duration(i64),

    #[error("window end {end} must be after start {start}")]
    EmptyWindow { start: TimeOfDay, end: TimeOfDay },

    #[error("interval starting at {start} with {minutes} minutes runs past midnight")]
    PastMidnight { start: TimeOfDay, minutes: u16 },
}

/// A wall-clock time with minute granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes <= LAST_MINUTE).then_some(Self(minutes))
    }

    pub fn from_hm(hours: u16, minutes: u16) -> Option<Self> {
        if hours > 23 || minutes > 59 {
            return None;
        }
        Some(Self(hours * 60 + minutes))
    }

    /// Parses `H:MM` or `HH:MM` (24-hour clock).
    pub fn parse(text: &str) -> Result<Self, InputError> {
        let invalid = || InputError::Time(text.to_string());

        let (hours, minutes) = text.split_once(':').ok_or_else(invalid)?;
        let well_formed = (1..=2).contains(&hours.len())
            && minutes.len() == 2
            && hours.bytes().all(|b| b.is_ascii_digit())
            && minutes.bytes().all(|b| b.is_ascii_digit());
        if !well_formed {
            return Err(invalid());
        }

        let hours: u16 = hours.parse().map_err(|_| invalid())?;
        let minutes: u16 = minutes.parse().map_err(|_| invalid())?;
        Self::from_hm(hours, minutes).ok_or_else(invalid)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    pub fn hour(self) -> u16 {
        self.0 / 60
    }

    pub fn minute(self) -> u16 {
        self.0 % 60
    }

    /// Adds `minutes`, returning `None` when the result would pass 23:59.
    pub fn checked_add(self, minutes: u16) -> Option<Self> {
        self.0.checked_add(minutes).and_then(Self::from_minutes)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for TimeOfDay {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<NaiveTime> for TimeOfDay {
    fn from(time: NaiveTime) -> Self {
        // hour() <= 23 and minute() <= 59, so this never exceeds LAST_MINUTE.
        Self((time.hour() * 60 + time.minute()) as u16)
    }
}

impl From<TimeOfDay> for NaiveTime {
    fn from(time: TimeOfDay) -> Self {
        NaiveTime::from_hms_opt(time.hour().into(), time.minute().into(), 0)
            .unwrap_or(NaiveTime::MIN)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

/// Day of the week, 0 = Sunday through 6 = Saturday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DayOfWeek(u8);

impl DayOfWeek {
    pub const SUNDAY: DayOfWeek = DayOfWeek(0);
    pub const MONDAY: DayOfWeek = DayOfWeek(1);
    pub const SATURDAY: DayOfWeek = DayOfWeek(6);

    pub fn new(index: i64) -> Result<Self, InputError> {
        match u8::try_from(index) {
            Ok(day) if day <= 6 => Ok(Self(day)),
            _ => Err(InputError::DayOfWeek(index)),
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl From<NaiveDate> for DayOfWeek {
    fn from(date: NaiveDate) -> Self {
        Self(date.weekday().num_days_from_sunday() as u8)
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for DayOfWeek {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let index = i64::deserialize(deserializer)?;
        Self::new(index).map_err(serde::de::Error::custom)
    }
}

/// A strictly positive service length in minutes, at most one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotDuration(u16);

impl SlotDuration {
    pub fn new(minutes: i64) -> Result<Self, InputError> {
        match u16::try_from(minutes) {
            Ok(m) if (1..=24 * 60).contains(&m) => Ok(Self(m)),
            _ => Err(InputError::Duration(minutes)),
        }
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

/// Parses an ISO-8601 calendar date. A full RFC 3339 timestamp is accepted
/// too and truncated to its date, since clients send both forms.
pub fn parse_calendar_date(text: &str) -> Result<NaiveDate, InputError> {
    let text = text.trim();
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.date_naive()))
        .map_err(|_| InputError::Date(text.to_string()))
}
