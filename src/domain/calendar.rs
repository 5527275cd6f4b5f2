//! Trading calendar: resolves the session that bounds a given instant.
//!
//! A calendar holds a default session per weekday, date-specific override
//! sessions and a holiday list. It is immutable once built and is shared
//! read-only (usually behind an `Arc`) by any number of resamplers.
//!
//! Session times are exchange-local wall times. When the calendar carries a
//! timezone, instants passed to [`TradingCalendar::schedule`] are UTC and are
//! localized before the lookup date is derived. The returned bounds are
//! converted back to UTC.

use crate::domain::error::BarsmithError;
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Weekday};
use chrono_tz::Tz;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

pub const DEFAULT_SEARCH_HORIZON_DAYS: u32 = 366;

/// Open and close wall times of one trading day. `open < close`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimes {
    open: NaiveTime,
    close: NaiveTime,
}

impl SessionTimes {
    pub fn new(open: NaiveTime, close: NaiveTime) -> Result<Self, BarsmithError> {
        if open >= close {
            return Err(BarsmithError::config(format!(
                "session open {open} must be before close {close}"
            )));
        }
        Ok(Self { open, close })
    }

    pub fn open(&self) -> NaiveTime {
        self.open
    }

    pub fn close(&self) -> NaiveTime {
        self.close
    }

    fn on(&self, date: NaiveDate) -> Session {
        Session {
            start: date.and_time(self.open),
            end: date.and_time(self.close),
        }
    }
}

/// Parses `HH:MM-HH:MM` (seconds optional on either side).
impl FromStr for SessionTimes {
    type Err = BarsmithError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (open, close) = s.split_once('-').ok_or_else(|| {
            BarsmithError::config(format!("invalid session '{s}', expected HH:MM-HH:MM"))
        })?;
        SessionTimes::new(parse_time(open)?, parse_time(close)?)
    }
}

pub(crate) fn parse_time(s: &str) -> Result<NaiveTime, BarsmithError> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| BarsmithError::config(format!("invalid time '{s}', expected HH:MM")))
}

/// A concrete session window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Session {
    pub fn contains(&self, instant: NaiveDateTime) -> bool {
        self.start <= instant && instant < self.end
    }
}

#[derive(Debug, Clone)]
pub struct TradingCalendar {
    weekdays: [Option<SessionTimes>; 7],
    overrides: BTreeMap<NaiveDate, SessionTimes>,
    holidays: BTreeSet<NaiveDate>,
    timezone: Option<Tz>,
    search_horizon_days: u32,
}

impl TradingCalendar {
    pub fn builder() -> TradingCalendarBuilder {
        TradingCalendarBuilder::default()
    }

    /// Monday to Friday with the same session, no holidays, no timezone.
    pub fn weekdays(open: NaiveTime, close: NaiveTime) -> Result<Self, BarsmithError> {
        let session = SessionTimes::new(open, close)?;
        let mut builder = Self::builder();
        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
        ] {
            builder = builder.weekday(day, Some(session));
        }
        builder.build()
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
    }

    pub fn search_horizon_days(&self) -> u32 {
        self.search_horizon_days
    }

    /// Session times in effect on `date`: holidays have none, overrides beat
    /// the weekday default.
    pub fn session_times(&self, date: NaiveDate) -> Option<SessionTimes> {
        if self.holidays.contains(&date) {
            return None;
        }
        self.overrides
            .get(&date)
            .copied()
            .or(self.weekdays[date.weekday().num_days_from_monday() as usize])
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        self.session_times(date).is_some()
    }

    /// The exchange-local session on `date`, if it trades.
    pub fn session_for(&self, date: NaiveDate) -> Option<Session> {
        self.session_times(date).map(|times| times.on(date))
    }

    /// Returns the first session whose end lies strictly after `instant`.
    ///
    /// `tz` overrides the calendar's own timezone for this lookup. With a
    /// timezone in effect `instant` is read as UTC and the result is UTC.
    /// Dates without a session are skipped; the forward search gives up
    /// after the configured horizon with
    /// [`BarsmithError::CalendarSearchExhausted`].
    pub fn schedule(
        &self,
        instant: NaiveDateTime,
        tz: Option<Tz>,
    ) -> Result<Session, BarsmithError> {
        let tz = tz.or(self.timezone);
        let local = match tz {
            Some(tz) => tz.from_utc_datetime(&instant).naive_local(),
            None => instant,
        };

        let mut date = local.date();
        for _ in 0..=self.search_horizon_days {
            if let Some(session) = self.session_for(date) {
                if local < session.end {
                    return match tz {
                        Some(tz) => Ok(Session {
                            start: to_utc(tz, session.start)?,
                            end: to_utc(tz, session.end)?,
                        }),
                        None => Ok(session),
                    };
                }
            }
            date = date.succ_opt().ok_or_else(|| {
                BarsmithError::config("calendar search ran past the last representable date")
            })?;
        }

        tracing::warn!(
            %instant,
            horizon_days = self.search_horizon_days,
            "calendar search exhausted"
        );
        Err(BarsmithError::CalendarSearchExhausted {
            instant,
            horizon_days: self.search_horizon_days,
        })
    }

    /// End of the session that would close a bar holding `instant`.
    ///
    /// With `edge_starts_next` unset, an instant exactly on a session end
    /// belongs to the session closing there rather than the next one.
    pub fn session_end(
        &self,
        instant: NaiveDateTime,
        edge_starts_next: bool,
    ) -> Result<NaiveDateTime, BarsmithError> {
        let lookup = if edge_starts_next {
            instant
        } else {
            instant - Duration::nanoseconds(1)
        };
        Ok(self.schedule(lookup, None)?.end)
    }
}

fn to_utc(tz: Tz, local: NaiveDateTime) -> Result<NaiveDateTime, BarsmithError> {
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| {
            BarsmithError::config(format!("session bound {local} does not exist in {tz}"))
        })
}

#[derive(Debug, Clone)]
pub struct TradingCalendarBuilder {
    weekdays: [Option<SessionTimes>; 7],
    overrides: BTreeMap<NaiveDate, SessionTimes>,
    holidays: BTreeSet<NaiveDate>,
    timezone: Option<Tz>,
    search_horizon_days: u32,
}

impl Default for TradingCalendarBuilder {
    fn default() -> Self {
        Self {
            weekdays: [None; 7],
            overrides: BTreeMap::new(),
            holidays: BTreeSet::new(),
            timezone: None,
            search_horizon_days: DEFAULT_SEARCH_HORIZON_DAYS,
        }
    }
}

impl TradingCalendarBuilder {
    pub fn weekday(mut self, day: Weekday, session: Option<SessionTimes>) -> Self {
        self.weekdays[day.num_days_from_monday() as usize] = session;
        self
    }

    pub fn override_session(mut self, date: NaiveDate, session: SessionTimes) -> Self {
        self.overrides.insert(date, session);
        self
    }

    pub fn holiday(mut self, date: NaiveDate) -> Self {
        self.holidays.insert(date);
        self
    }

    pub fn timezone(mut self, tz: Tz) -> Self {
        self.timezone = Some(tz);
        self
    }

    pub fn search_horizon_days(mut self, days: u32) -> Self {
        self.search_horizon_days = days;
        self
    }

    pub fn build(self) -> Result<TradingCalendar, BarsmithError> {
        if self.search_horizon_days == 0 {
            return Err(BarsmithError::config("search horizon must be at least one day"));
        }
        if self.weekdays.iter().all(Option::is_none) && self.overrides.is_empty() {
            return Err(BarsmithError::config("calendar defines no trading sessions"));
        }
        if let Some(date) = self.overrides.keys().find(|d| self.holidays.contains(d)) {
            return Err(BarsmithError::config(format!(
                "{date} is both a holiday and an override session"
            )));
        }
        Ok(TradingCalendar {
            weekdays: self.weekdays,
            overrides: self.overrides,
            holidays: self.holidays,
            timezone: self.timezone,
            search_horizon_days: self.search_horizon_days,
        })
    }
}
