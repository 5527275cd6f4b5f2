#![allow(dead_code)]

use barsmith::adapters::clock_adapter::ManualClock;
use barsmith::adapters::synthetic_feed::{SyntheticFeed, SyntheticFeedConfig};
use barsmith::domain::bar::Bar;
use barsmith::domain::calendar::TradingCalendar;
use barsmith::domain::driver;
use barsmith::domain::error::BarsmithError;
use barsmith::domain::resampler::{Resampler, ResamplerConfig};
use barsmith::domain::series::BarRecorder;
use barsmith::domain::timeframe::{Compression, Timeframe};
use barsmith::ports::feed_port::{Feed, Poll};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Arc;

pub fn dt(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, s)
        .unwrap()
}

/// Day-end stamp of a date without a calendar: 23:59:59.999989.
pub fn eod(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_micro_opt(23, 59, 59, 999_989)
        .unwrap()
}

pub fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

pub fn weekday_calendar(open: NaiveTime, close: NaiveTime) -> Arc<TradingCalendar> {
    Arc::new(TradingCalendar::weekdays(open, close).unwrap())
}

pub fn comp(n: u32) -> Compression {
    Compression::new(n).unwrap()
}

pub fn target(timeframe: Timeframe, compression: u32) -> ResamplerConfig {
    ResamplerConfig::new(timeframe, comp(compression))
}

pub fn backtest_ticks(interval_secs: i64, count: u32) -> SyntheticFeedConfig {
    SyntheticFeedConfig {
        timeframe: Timeframe::Ticks,
        tick_interval: Duration::seconds(interval_secs),
        num_gen_bars: count,
        ..Default::default()
    }
}

pub fn backtest_bars(timeframe: Timeframe, compression: u32, count: u32) -> SyntheticFeedConfig {
    SyntheticFeedConfig {
        timeframe,
        compression: comp(compression),
        num_gen_bars: count,
        ..Default::default()
    }
}

/// A live source without backfill.
pub fn live(source: SyntheticFeedConfig, run_secs: i64) -> SyntheticFeedConfig {
    SyntheticFeedConfig {
        live: true,
        num_gen_bars: 0,
        run_duration: Duration::seconds(run_secs),
        ..source
    }
}

/// Resamples a synthetic source whose clock starts at `start`. Each
/// `Waiting` advances the clock by one second.
pub fn resample_synthetic(
    source: SyntheticFeedConfig,
    config: ResamplerConfig,
    start: NaiveDateTime,
) -> Result<Vec<Bar>, BarsmithError> {
    let clock = ManualClock::new(start);
    let feed = SyntheticFeed::new(source, clock.clone())?;
    let mut resampler = Resampler::new(feed, config)?;
    collect(&mut resampler, &clock)
}

pub fn collect<F: Feed>(feed: &mut F, clock: &ManualClock) -> Result<Vec<Bar>, BarsmithError> {
    let mut recorder = BarRecorder::new();
    driver::run(feed, &mut recorder, || clock.advance(Duration::seconds(1)))?;
    Ok(recorder.into_series().as_slice().to_vec())
}

#[track_caller]
pub fn assert_bar(bar: &Bar, timestamp: NaiveDateTime, open: f64, close: f64) {
    assert_eq!(bar.timestamp, timestamp, "timestamp of {bar:?}");
    assert_eq!(bar.open, open, "open of {bar:?}");
    assert_eq!(bar.close, close, "close of {bar:?}");
}

/// Scripted feed: replays a fixed sequence of poll results.
pub struct VecFeed {
    name: String,
    timeframe: Timeframe,
    script: Vec<Poll<Bar>>,
    cursor: usize,
    live: bool,
    clock: Option<ManualClock>,
    current: Bar,
}

impl VecFeed {
    pub fn new(timeframe: Timeframe, script: Vec<Poll<Bar>>) -> Self {
        Self {
            name: "vec".to_string(),
            timeframe,
            script,
            cursor: 0,
            live: false,
            clock: None,
            current: Bar::default(),
        }
    }

    pub fn live(mut self, clock: ManualClock) -> Self {
        self.live = true;
        self.clock = Some(clock);
        self
    }
}

impl Feed for VecFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) {
        self.cursor = 0;
    }

    fn poll(&mut self) -> Result<Poll<Bar>, BarsmithError> {
        let result = self.script.get(self.cursor).copied().unwrap_or(Poll::Exhausted);
        self.cursor += 1;
        if let Poll::Ready(bar) = result {
            self.current = bar;
        }
        Ok(result)
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn current(&self) -> &Bar {
        &self.current
    }

    fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    fn compression(&self) -> Compression {
        Compression::ONE
    }

    fn clock_time(&self) -> Option<NaiveDateTime> {
        self.clock.as_ref().map(|c| barsmith::ports::clock_port::Clock::now(c))
    }
}
