//! Synthetic price source.
//!
//! Produces bars whose price rises by one on every delivery, starting from
//! `starting_value`. In backtest mode a fixed number of bars is generated
//! back to back. In live mode the feed first backfills `num_gen_bars`
//! historical bars ending at the start time, then releases one bar per
//! `compression` sub-steps as the clock advances, until `run_duration` has
//! elapsed.
//!
//! All timing comes from the injected [`Clock`], so tests run the live mode
//! deterministically with a [`ManualClock`](crate::adapters::clock_adapter::ManualClock).

use crate::domain::bar::Bar;
use crate::domain::config::{read_compression, read_non_negative, read_timeframe};
use crate::domain::error::BarsmithError;
use crate::domain::timeframe::{Compression, Timeframe};
use crate::ports::clock_port::Clock;
use crate::ports::config_port::ConfigPort;
use crate::ports::feed_port::{Feed, Poll};
use chrono::{Duration, NaiveDateTime};

pub const DEFAULT_STARTING_VALUE: f64 = 200.0;
pub const DEFAULT_TICK_INTERVAL_SECS: i64 = 25;
pub const DEFAULT_RUN_DURATION_SECS: i64 = 30;
pub const DEFAULT_NUM_GEN_BARS: u32 = 10;
pub const FEED_SECTION: &str = "feed";

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticFeedConfig {
    pub name: String,
    pub timeframe: Timeframe,
    pub compression: Compression,
    pub starting_value: f64,
    /// Spacing between ticks when `timeframe` is `Ticks`.
    pub tick_interval: Duration,
    pub start_delay: Duration,
    /// Live mode only.
    pub run_duration: Duration,
    /// Bars generated in backtest mode, or backfilled before live pacing.
    pub num_gen_bars: u32,
    pub live: bool,
}

impl Default for SyntheticFeedConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            timeframe: Timeframe::Ticks,
            compression: Compression::ONE,
            starting_value: DEFAULT_STARTING_VALUE,
            tick_interval: Duration::seconds(DEFAULT_TICK_INTERVAL_SECS),
            start_delay: Duration::zero(),
            run_duration: Duration::seconds(DEFAULT_RUN_DURATION_SECS),
            num_gen_bars: DEFAULT_NUM_GEN_BARS,
            live: false,
        }
    }
}

impl SyntheticFeedConfig {
    /// One pacing step: a tick interval for ticks, else one timeframe unit.
    pub fn step(&self) -> Duration {
        self.timeframe.unit().unwrap_or(self.tick_interval)
    }

    /// Span covered by one delivered bar.
    pub fn bar_width(&self) -> Duration {
        let factor = i32::try_from(self.compression.get()).unwrap_or(i32::MAX);
        self.step().checked_mul(factor).unwrap_or(Duration::MAX)
    }

    /// Reads the `[feed]` section; every key is optional.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BarsmithError> {
        let defaults = Self::default();
        let secs = |key: &str, default: &Duration| -> Result<Duration, BarsmithError> {
            read_non_negative(config, FEED_SECTION, key, default.num_seconds())
                .map(Duration::seconds)
        };
        let num_gen_bars = read_non_negative(
            config,
            FEED_SECTION,
            "num_gen_bars",
            i64::from(defaults.num_gen_bars),
        )?;
        let feed = Self {
            name: config
                .get_string(FEED_SECTION, "name")
                .unwrap_or_else(|| defaults.name.clone()),
            timeframe: read_timeframe(config, FEED_SECTION, Some(defaults.timeframe))?,
            compression: read_compression(config, FEED_SECTION)?,
            starting_value: config.get_double(
                FEED_SECTION,
                "starting_value",
                defaults.starting_value,
            ),
            tick_interval: secs("tick_interval_secs", &defaults.tick_interval)?,
            start_delay: secs("start_delay_secs", &defaults.start_delay)?,
            run_duration: secs("run_duration_secs", &defaults.run_duration)?,
            num_gen_bars: u32::try_from(num_gen_bars).unwrap_or(u32::MAX),
            live: config.get_bool(FEED_SECTION, "live", defaults.live),
        };
        feed.validate()?;
        Ok(feed)
    }

    pub fn validate(&self) -> Result<(), BarsmithError> {
        if self.timeframe == Timeframe::Ticks && self.tick_interval <= Duration::zero() {
            return Err(BarsmithError::config("tick interval must be positive"));
        }
        if self.start_delay < Duration::zero() || self.run_duration < Duration::zero() {
            return Err(BarsmithError::config(
                "start delay and run duration must not be negative",
            ));
        }
        Ok(())
    }
}

pub struct SyntheticFeed<C> {
    config: SyntheticFeedConfig,
    clock: C,
    started_at: Option<NaiveDateTime>,
    value: f64,
    next_stamp: NaiveDateTime,
    last_step: NaiveDateTime,
    substeps: u32,
    delivered: u32,
    backfill_remaining: u32,
    exhausted: bool,
    current: Bar,
}

impl<C: Clock> SyntheticFeed<C> {
    pub fn new(config: SyntheticFeedConfig, clock: C) -> Result<Self, BarsmithError> {
        config.validate()?;
        Ok(Self {
            value: config.starting_value,
            config,
            clock,
            started_at: None,
            next_stamp: NaiveDateTime::default(),
            last_step: NaiveDateTime::default(),
            substeps: 0,
            delivered: 0,
            backfill_remaining: 0,
            exhausted: false,
            current: Bar::default(),
        })
    }

    pub fn config(&self) -> &SyntheticFeedConfig {
        &self.config
    }

    /// Bars handed out since `start()`.
    pub fn delivered(&self) -> u32 {
        self.delivered
    }

    fn deliver(&mut self, timestamp: NaiveDateTime) -> Poll<Bar> {
        let bar = Bar::tick(timestamp, self.value);
        self.value += 1.0;
        self.delivered += 1;
        self.current = bar;
        tracing::trace!(
            feed = %self.config.name,
            t = %timestamp,
            close = bar.close,
            "synthetic bar"
        );
        Poll::Ready(bar)
    }

    fn exhaust(&mut self) -> Poll<Bar> {
        if !self.exhausted {
            tracing::info!(
                feed = %self.config.name,
                delivered = self.delivered,
                "synthetic feed exhausted"
            );
            self.exhausted = true;
        }
        Poll::Exhausted
    }

    fn poll_backtest(&mut self) -> Poll<Bar> {
        if self.delivered >= self.config.num_gen_bars {
            return self.exhaust();
        }
        let stamp = self.next_stamp;
        self.next_stamp = stamp + self.config.bar_width();
        self.deliver(stamp)
    }

    fn poll_live(&mut self, now: NaiveDateTime, elapsed: Duration) -> Poll<Bar> {
        if elapsed > self.config.run_duration {
            return self.exhaust();
        }
        if self.backfill_remaining > 0 {
            self.backfill_remaining -= 1;
            let stamp = self.next_stamp;
            self.next_stamp = stamp + self.config.bar_width();
            return self.deliver(stamp);
        }

        let step = self.config.step();
        if now - self.last_step < step {
            return Poll::Waiting;
        }
        self.last_step += step;
        self.substeps += 1;
        if self.substeps < self.config.compression.get() {
            return Poll::Waiting;
        }
        self.substeps = 0;
        self.deliver(self.last_step)
    }
}

impl<C: Clock> Feed for SyntheticFeed<C> {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn start(&mut self) {
        let now = self.clock.now();
        let anchor = self.config.timeframe.floor(now);
        let width = self.config.bar_width();

        self.started_at = Some(now);
        self.value = self.config.starting_value;
        self.substeps = 0;
        self.delivered = 0;
        self.exhausted = false;
        self.current = Bar::default();
        self.last_step = anchor;

        if self.config.live {
            let back =
                i32::try_from(self.config.num_gen_bars.saturating_sub(1)).unwrap_or(i32::MAX);
            self.backfill_remaining = self.config.num_gen_bars;
            self.next_stamp = anchor - width.checked_mul(back).unwrap_or(Duration::zero());
        } else {
            self.backfill_remaining = 0;
            self.next_stamp = anchor + width;
        }
        tracing::info!(
            feed = %self.config.name,
            live = self.config.live,
            %now,
            first = %self.next_stamp,
            "synthetic feed started"
        );
    }

    fn poll(&mut self) -> Result<Poll<Bar>, BarsmithError> {
        if self.exhausted {
            return Ok(Poll::Exhausted);
        }
        let Some(started_at) = self.started_at else {
            return Err(BarsmithError::stream(&self.config.name, "polled before start"));
        };
        let now = self.clock.now();
        let elapsed = now - started_at;
        if elapsed < self.config.start_delay {
            return Ok(Poll::Waiting);
        }
        Ok(if self.config.live {
            self.poll_live(now, elapsed)
        } else {
            self.poll_backtest()
        })
    }

    fn is_live(&self) -> bool {
        self.config.live
    }

    fn current(&self) -> &Bar {
        &self.current
    }

    fn timeframe(&self) -> Timeframe {
        self.config.timeframe
    }

    fn compression(&self) -> Compression {
        self.config.compression
    }

    fn clock_time(&self) -> Option<NaiveDateTime> {
        self.config.live.then(|| self.clock.now())
    }
}
