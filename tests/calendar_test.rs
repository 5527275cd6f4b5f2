//! Calendar-driven resampling built from INI configuration.

mod common;

use barsmith::adapters::clock_adapter::ManualClock;
use barsmith::adapters::file_config_adapter::FileConfigAdapter;
use barsmith::adapters::replay_feed::ReplayFeed;
use barsmith::domain::bar::Bar;
use barsmith::domain::calendar::TradingCalendar;
use barsmith::domain::config::{build_calendar, build_resampler_config};
use barsmith::domain::error::BarsmithError;
use barsmith::domain::resampler::Resampler;
use barsmith::domain::timeframe::{Compression, Timeframe};
use chrono::{Duration, NaiveDate, Weekday};
use common::*;
use std::sync::Arc;

fn calendar_from(ini: &str) -> Arc<TradingCalendar> {
    Arc::new(build_calendar(&FileConfigAdapter::from_string(ini).unwrap()).unwrap())
}

fn daily_with(calendar: Arc<TradingCalendar>, ticks: u32) -> Vec<Bar> {
    resample_synthetic(
        backtest_ticks(600, ticks),
        target(Timeframe::Days, 1).with_calendar(calendar),
        dt(2015, 1, 1, 0, 0, 0),
    )
    .unwrap()
}

#[test]
fn holiday_and_weekend_are_skipped() {
    let cal = calendar_from("[calendar]\nopen = 08:00\nclose = 20:00\nholidays = 2015-01-02\n");
    let bars = daily_with(cal, 900);
    assert_eq!(bars.len(), 3);
    assert_bar(&bars[0], dt(2015, 1, 1, 20, 0, 0), 200.0, 319.0);
    assert_bar(&bars[1], dt(2015, 1, 5, 20, 0, 0), 320.0, 895.0);
    assert_bar(&bars[2], dt(2015, 1, 6, 20, 0, 0), 896.0, 1039.0);
}

#[test]
fn override_closes_early() {
    let cal = calendar_from(
        "[calendar]\nopen = 08:00\nclose = 20:00\n[calendar.overrides]\n2015-01-02 = 08:00-13:00\n",
    );
    let bars = daily_with(cal, 600);
    assert_eq!(bars.len(), 2);
    assert_bar(&bars[0], dt(2015, 1, 1, 20, 0, 0), 200.0, 319.0);
    assert_bar(&bars[1], dt(2015, 1, 2, 13, 0, 0), 320.0, 421.0);
}

#[test]
fn config_driven_resampler_matches_builder() {
    let ini = "[resample]\ntimeframe = days\nuse_calendar = true\n\
        [calendar]\nopen = 08:00\nclose = 20:00\n";
    let config = build_resampler_config(&FileConfigAdapter::from_string(ini).unwrap()).unwrap();
    let from_ini =
        resample_synthetic(backtest_ticks(600, 600), config, dt(2015, 1, 1, 0, 0, 0)).unwrap();
    let from_builder = daily_with(weekday_calendar(hm(8, 0), hm(20, 0)), 600);
    assert_eq!(from_ini, from_builder);
}

#[test]
fn timezone_calendar_stamps_utc_session_close() {
    let cal = calendar_from("[calendar]\ntimezone = America/New_York\nopen = 09:30\nclose = 16:00\n");
    // 2024-01-02 is a Tuesday; EST is UTC-5
    let start = dt(2024, 1, 2, 14, 0, 0);
    let samples = (0..18)
        .map(|i| Bar::tick(start + Duration::minutes(30 * i), i as f64))
        .collect();
    let feed = ReplayFeed::new("utc", Timeframe::Ticks, Compression::ONE, samples);
    let mut r = Resampler::new(feed, target(Timeframe::Days, 1).with_calendar(cal)).unwrap();
    let bars = collect(&mut r, &ManualClock::new(start)).unwrap();
    assert_eq!(bars.len(), 1);
    assert_bar(&bars[0], dt(2024, 1, 2, 21, 0, 0), 0.0, 14.0);
}

#[test]
fn search_exhaustion_fails_the_run() {
    let only_day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let cal = TradingCalendar::builder()
        .weekday(Weekday::Mon, None)
        .override_session(only_day, "09:00-17:00".parse().unwrap())
        .search_horizon_days(10)
        .build()
        .unwrap();
    let samples = vec![Bar::tick(dt(2024, 2, 1, 12, 0, 0), 1.0)];
    let feed = ReplayFeed::new("late", Timeframe::Ticks, Compression::ONE, samples);
    let mut r =
        Resampler::new(feed, target(Timeframe::Days, 1).with_calendar(Arc::new(cal))).unwrap();
    let err = collect(&mut r, &ManualClock::new(dt(2024, 2, 1, 0, 0, 0))).unwrap_err();
    assert!(matches!(
        err,
        BarsmithError::CalendarSearchExhausted { horizon_days: 10, .. }
    ));
}

#[test]
fn schedule_rolls_past_close_to_next_trading_day() {
    let cal = calendar_from("[calendar]\nopen = 09:00\nclose = 17:30\n");
    // Friday evening resolves to Monday
    let session = cal.schedule(dt(2024, 1, 5, 18, 0, 0), None).unwrap();
    assert_eq!(session.start, dt(2024, 1, 8, 9, 0, 0));
    assert_eq!(session.end, dt(2024, 1, 8, 17, 30, 0));
    // before the open resolves to the same day
    let session = cal.schedule(dt(2024, 1, 8, 6, 0, 0), None).unwrap();
    assert_eq!(session.end, dt(2024, 1, 8, 17, 30, 0));
}
