//! Bucket boundary rules.
//!
//! Without a calendar, sub-daily buckets sit on a grid aligned to local
//! midnight and never extend past the next midnight; daily buckets end at
//! the day's end. The day's end is stamped just before the next midnight so
//! a bar belongs to the date it covers: a grid bucket closing on midnight
//! still takes a sample stamped at midnight, but is stamped at the day's
//! end. With a calendar attached the session close takes the place of the
//! day's end.
//!
//! `edge_starts_next` decides which bucket owns a timestamp lying exactly on
//! a boundary: unset, buckets are `(prev, end]`; set, they are `[prev, end)`.

use crate::domain::calendar::TradingCalendar;
use crate::domain::error::BarsmithError;
use crate::domain::timeframe::{midnight, nanos_between, Compression, Timeframe};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Gap between a day's end stamp and the following midnight.
pub const END_OF_DAY_EPSILON_MICROS: i64 = 11;

/// How a resampler groups samples into sub-periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucketing {
    /// Every `compression` samples form one bar.
    Count,
    /// Fixed-width buckets on a grid aligned to midnight.
    Grid { width: Duration },
    /// One sub-period per day or session; `compression` of them make a bar.
    Daily,
}

impl Bucketing {
    pub fn for_target(
        timeframe: Timeframe,
        compression: Compression,
    ) -> Result<Self, BarsmithError> {
        match timeframe.unit() {
            None => Ok(Bucketing::Count),
            Some(_) if timeframe == Timeframe::Days => Ok(Bucketing::Daily),
            Some(unit) => {
                let factor = i32::try_from(compression.get()).unwrap_or(i32::MAX);
                let width = unit
                    .checked_mul(factor)
                    .filter(|w| *w <= Duration::days(1))
                    .ok_or_else(|| {
                        BarsmithError::config(format!(
                            "{compression} {timeframe} spans more than a day, resample to days instead"
                        ))
                    })?;
                Ok(Bucketing::Grid { width })
            }
        }
    }

    /// Sub-period closes that make up one emitted bar.
    pub fn closes_per_bar(self, compression: Compression) -> u32 {
        match self {
            Bucketing::Grid { .. } => 1,
            Bucketing::Count | Bucketing::Daily => compression.get(),
        }
    }
}

/// Stamp of the last instant belonging to `date`.
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    midnight(date) + Duration::days(1) - Duration::microseconds(END_OF_DAY_EPSILON_MICROS)
}

/// End of the day bucket owning `t`.
pub fn day_end(t: NaiveDateTime, edge_starts_next: bool) -> NaiveDateTime {
    let eod = end_of_day(t.date());
    if t < eod || (t == eod && !edge_starts_next) {
        eod
    } else {
        eod + Duration::days(1)
    }
}

/// Grid line closing the bucket that owns `t`. `width` must not exceed a day.
pub fn grid_end(t: NaiveDateTime, width: Duration, edge_starts_next: bool) -> NaiveDateTime {
    let start = midnight(t.date());
    let since = nanos_between(start, t);
    let w = width.num_nanoseconds().unwrap_or(i64::MAX).max(1);
    let steps = if edge_starts_next {
        since / w + 1
    } else {
        since / w + i64::from(since % w != 0)
    };
    start + Duration::nanoseconds(steps * w)
}

/// Boundary of the grid bucket owning `t`, clipped at the next midnight or
/// the session end.
pub fn grid_bucket_end(
    t: NaiveDateTime,
    width: Duration,
    edge_starts_next: bool,
    calendar: Option<&TradingCalendar>,
) -> Result<NaiveDateTime, BarsmithError> {
    let grid = grid_end(t, width, edge_starts_next);
    let cap = match calendar {
        Some(cal) => cal.session_end(t, edge_starts_next)?,
        None => midnight(t.date()) + Duration::days(1),
    };
    Ok(grid.min(cap))
}

/// Stamp of a bar whose calendar-free grid bucket closes at `end`.
pub fn grid_stamp(end: NaiveDateTime) -> NaiveDateTime {
    if end == midnight(end.date()) {
        end - Duration::microseconds(END_OF_DAY_EPSILON_MICROS)
    } else {
        end
    }
}

/// Boundary of the day or session owning `t`.
pub fn daily_bucket_end(
    t: NaiveDateTime,
    edge_starts_next: bool,
    calendar: Option<&TradingCalendar>,
) -> Result<NaiveDateTime, BarsmithError> {
    match calendar {
        Some(cal) => cal.session_end(t, edge_starts_next),
        None => Ok(day_end(t, edge_starts_next)),
    }
}
