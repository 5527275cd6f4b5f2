//! Builds calendars and resampler settings from INI configuration.
//!
//! Sections read here:
//!
//! ```ini
//! [calendar]
//! timezone = America/New_York        ; optional
//! search_horizon_days = 366          ; optional
//! open = 09:30                       ; Monday to Friday
//! close = 16:00
//! saturday = 10:00-14:00             ; per-day session or "closed"
//! holidays = 2024-12-25, 2024-01-01
//!
//! [calendar.overrides]
//! 2024-12-24 = 09:30-13:00
//!
//! [resample]
//! timeframe = minutes
//! compression = 5
//! tickedgestart = false
//! use_calendar = true
//!
//! [source]
//! timeframe = ticks
//! compression = 1
//! ```

use crate::domain::calendar::{
    parse_time, SessionTimes, TradingCalendar, DEFAULT_SEARCH_HORIZON_DAYS,
};
use crate::domain::error::BarsmithError;
use crate::domain::resampler::ResamplerConfig;
use crate::domain::timeframe::{Compression, Timeframe};
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use std::sync::Arc;

pub const CALENDAR_SECTION: &str = "calendar";
pub const OVERRIDES_SECTION: &str = "calendar.overrides";
pub const RESAMPLE_SECTION: &str = "resample";
pub const SOURCE_SECTION: &str = "source";

const DEFAULT_OPEN: (u32, u32) = (9, 0);
const DEFAULT_CLOSE: (u32, u32) = (17, 30);

const WEEKDAY_KEYS: [(&str, Weekday); 7] = [
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BarsmithError {
    BarsmithError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> BarsmithError {
    BarsmithError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// Reads `key` as a timeframe. Absent keys fall back to `default`, or are
/// reported missing when there is none.
pub(crate) fn read_timeframe(
    config: &dyn ConfigPort,
    section: &str,
    default: Option<Timeframe>,
) -> Result<Timeframe, BarsmithError> {
    match config.get_string(section, "timeframe") {
        Some(s) => s
            .parse()
            .map_err(|e: BarsmithError| invalid(section, "timeframe", e.to_string())),
        None => default.ok_or_else(|| missing(section, "timeframe")),
    }
}

pub(crate) fn read_compression(
    config: &dyn ConfigPort,
    section: &str,
) -> Result<Compression, BarsmithError> {
    let value = config.get_int(section, "compression", 1);
    u32::try_from(value)
        .ok()
        .and_then(|v| Compression::new(v).ok())
        .ok_or_else(|| invalid(section, "compression", "compression must be a positive integer"))
}

/// Reads a non-negative integer, defaulting when absent.
pub(crate) fn read_non_negative(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, BarsmithError> {
    let value = config.get_int(section, key, default);
    if value < 0 {
        return Err(invalid(section, key, format!("{key} must not be negative")));
    }
    Ok(value)
}

/// Whether the configuration describes a calendar at all.
pub fn has_calendar(config: &dyn ConfigPort) -> bool {
    !config.keys(CALENDAR_SECTION).is_empty() || !config.keys(OVERRIDES_SECTION).is_empty()
}

pub fn build_calendar(config: &dyn ConfigPort) -> Result<TradingCalendar, BarsmithError> {
    let mut builder = TradingCalendar::builder();

    if let Some(name) = config.get_string(CALENDAR_SECTION, "timezone") {
        let tz: Tz = name
            .trim()
            .parse()
            .map_err(|_| {
                invalid(CALENDAR_SECTION, "timezone", format!("unknown timezone '{name}'"))
            })?;
        builder = builder.timezone(tz);
    }

    let horizon = read_non_negative(
        config,
        CALENDAR_SECTION,
        "search_horizon_days",
        i64::from(DEFAULT_SEARCH_HORIZON_DAYS),
    )?;
    let horizon = u32::try_from(horizon)
        .ok()
        .filter(|h| *h > 0)
        .ok_or_else(|| {
            invalid(CALENDAR_SECTION, "search_horizon_days", "must be between 1 and 4294967295")
        })?;
    builder = builder.search_horizon_days(horizon);

    let weekday_session = default_weekday_session(config)?;
    for (key, day) in WEEKDAY_KEYS {
        let default = match day {
            Weekday::Sat | Weekday::Sun => None,
            _ => Some(weekday_session),
        };
        let session = match config.get_string(CALENDAR_SECTION, key) {
            Some(value) => parse_day_session(&value, key)?,
            None => default,
        };
        builder = builder.weekday(day, session);
    }

    if let Some(list) = config.get_string(CALENDAR_SECTION, "holidays") {
        for raw in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            builder = builder.holiday(parse_date(raw, CALENDAR_SECTION, "holidays")?);
        }
    }

    for key in config.keys(OVERRIDES_SECTION) {
        let date = parse_date(&key, OVERRIDES_SECTION, &key)?;
        let value = config
            .get_string(OVERRIDES_SECTION, &key)
            .ok_or_else(|| missing(OVERRIDES_SECTION, &key))?;
        let session: SessionTimes = value
            .parse()
            .map_err(|e: BarsmithError| invalid(OVERRIDES_SECTION, &key, e.to_string()))?;
        builder = builder.override_session(date, session);
    }

    builder.build()
}

/// Monday to Friday session from `open`/`close`, defaulting to 09:00-17:30.
fn default_weekday_session(config: &dyn ConfigPort) -> Result<SessionTimes, BarsmithError> {
    let read = |key: &str, (h, m): (u32, u32)| -> Result<NaiveTime, BarsmithError> {
        match config.get_string(CALENDAR_SECTION, key) {
            Some(s) => parse_time(&s).map_err(|e| invalid(CALENDAR_SECTION, key, e.to_string())),
            None => NaiveTime::from_hms_opt(h, m, 0)
                .ok_or_else(|| invalid(CALENDAR_SECTION, key, "invalid default time")),
        }
    };
    let open = read("open", DEFAULT_OPEN)?;
    let close = read("close", DEFAULT_CLOSE)?;
    SessionTimes::new(open, close).map_err(|e| invalid(CALENDAR_SECTION, "close", e.to_string()))
}

fn parse_day_session(value: &str, key: &str) -> Result<Option<SessionTimes>, BarsmithError> {
    if value.trim().eq_ignore_ascii_case("closed") {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|e: BarsmithError| invalid(CALENDAR_SECTION, key, e.to_string()))
}

fn parse_date(s: &str, section: &str, key: &str) -> Result<NaiveDate, BarsmithError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
        invalid(section, key, format!("invalid date '{s}', expected YYYY-MM-DD"))
    })
}

/// Timeframe and compression of the input stream.
pub fn source_timeframe(
    config: &dyn ConfigPort,
) -> Result<(Timeframe, Compression), BarsmithError> {
    let timeframe = read_timeframe(config, SOURCE_SECTION, Some(Timeframe::Ticks))?;
    let compression = read_compression(config, SOURCE_SECTION)?;
    Ok((timeframe, compression))
}

pub fn build_resampler_config(config: &dyn ConfigPort) -> Result<ResamplerConfig, BarsmithError> {
    let timeframe = read_timeframe(config, RESAMPLE_SECTION, None)?;
    let compression = read_compression(config, RESAMPLE_SECTION)?;
    let mut resampler = ResamplerConfig::new(timeframe, compression)
        .with_tick_edge_start(config.get_bool(RESAMPLE_SECTION, "tickedgestart", false));
    resampler.fail_on_partial = config.get_bool(RESAMPLE_SECTION, "fail_on_partial", false);

    if config.get_bool(RESAMPLE_SECTION, "use_calendar", false) {
        if !has_calendar(config) {
            return Err(missing(CALENDAR_SECTION, "open"));
        }
        resampler = resampler.with_calendar(Arc::new(build_calendar(config)?));
    }
    Ok(resampler)
}
