//! Timeframe and compression model.
//!
//! A [`Timeframe`] names the base unit of a stream's granularity and a
//! [`Compression`] says how many of those units make up one bar.

use crate::domain::error::BarsmithError;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;

/// Ordered from finest to coarsest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Timeframe {
    Ticks,
    Seconds,
    Minutes,
    Days,
}

impl Timeframe {
    /// Width of one unit. Ticks have no fixed width.
    pub fn unit(self) -> Option<Duration> {
        match self {
            Timeframe::Ticks => None,
            Timeframe::Seconds => Some(Duration::seconds(1)),
            Timeframe::Minutes => Some(Duration::minutes(1)),
            Timeframe::Days => Some(Duration::days(1)),
        }
    }

    /// Truncates `t` to the start of its unit. Ticks truncate to the second.
    pub fn floor(self, t: NaiveDateTime) -> NaiveDateTime {
        let midnight = midnight(t.date());
        let unit_nanos = match self {
            Timeframe::Ticks | Timeframe::Seconds => 1_000_000_000,
            Timeframe::Minutes => 60 * 1_000_000_000,
            Timeframe::Days => return midnight,
        };
        let since = nanos_between(midnight, t);
        t - Duration::nanoseconds(since % unit_nanos)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Timeframe::Ticks => "ticks",
            Timeframe::Seconds => "seconds",
            Timeframe::Minutes => "minutes",
            Timeframe::Days => "days",
        };
        f.write_str(name)
    }
}

impl FromStr for Timeframe {
    type Err = BarsmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tick" | "ticks" => Ok(Timeframe::Ticks),
            "s" | "second" | "seconds" => Ok(Timeframe::Seconds),
            "m" | "minute" | "minutes" => Ok(Timeframe::Minutes),
            "d" | "day" | "days" => Ok(Timeframe::Days),
            _ => Err(BarsmithError::UnsupportedTimeframe {
                value: s.to_string(),
            }),
        }
    }
}

/// Number of base units merged into one bar. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Compression(NonZeroU32);

impl Compression {
    pub const ONE: Compression = Compression(NonZeroU32::MIN);

    pub fn new(value: u32) -> Result<Self, BarsmithError> {
        NonZeroU32::new(value)
            .map(Compression)
            .ok_or_else(|| BarsmithError::config("compression must be at least 1"))
    }

    pub fn get(self) -> u32 {
        self.0.get()
    }
}

impl Default for Compression {
    fn default() -> Self {
        Compression::ONE
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub(crate) fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

/// Nanoseconds from `from` to `to`. Only used for spans well inside i64 range.
pub(crate) fn nanos_between(from: NaiveDateTime, to: NaiveDateTime) -> i64 {
    (to - from).num_nanoseconds().unwrap_or(i64::MAX)
}
