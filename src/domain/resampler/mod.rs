//! Bar resampler: re-buckets one feed's samples into coarser bars.
//!
//! The resampler pulls from an upstream [`Feed`] and is itself a [`Feed`],
//! so resampled streams chain. Each poll consumes at most one upstream
//! sample. A bar is handed out only when its bucket closes. A bar still
//! open when the upstream is exhausted never reached its boundary and is
//! dropped.
//!
//! Live upstreams also close buckets on the clock: once the pacing clock
//! has moved past the open boundary and the upstream has nothing more to
//! deliver, the bucket closes without waiting for the next sample.

pub mod boundary;
pub mod state;

use crate::domain::bar::Bar;
use crate::domain::calendar::TradingCalendar;
use crate::domain::error::BarsmithError;
use crate::domain::timeframe::{Compression, Timeframe};
use crate::ports::feed_port::{Feed, Poll};
use boundary::Bucketing;
use chrono::NaiveDateTime;
use state::ResamplerState;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ResamplerConfig {
    pub timeframe: Timeframe,
    pub compression: Compression,
    /// A sample exactly on a boundary opens the next bar instead of closing
    /// the current one.
    pub tick_edge_start: bool,
    pub calendar: Option<Arc<TradingCalendar>>,
    /// Report a bar left open at stream end as an error instead of dropping it silently.
    pub fail_on_partial: bool,
}

impl ResamplerConfig {
    pub fn new(timeframe: Timeframe, compression: Compression) -> Self {
        Self {
            timeframe,
            compression,
            tick_edge_start: false,
            calendar: None,
            fail_on_partial: false,
        }
    }

    pub fn with_calendar(mut self, calendar: Arc<TradingCalendar>) -> Self {
        self.calendar = Some(calendar);
        self
    }

    pub fn with_tick_edge_start(mut self, tick_edge_start: bool) -> Self {
        self.tick_edge_start = tick_edge_start;
        self
    }
}

pub struct Resampler<F> {
    upstream: F,
    config: ResamplerConfig,
    bucketing: Bucketing,
    closes_per_bar: u32,
    name: String,
    state: ResamplerState,
    current: Bar,
}

impl<F: Feed> Resampler<F> {
    pub fn new(upstream: F, config: ResamplerConfig) -> Result<Self, BarsmithError> {
        if config.timeframe < upstream.timeframe() {
            return Err(BarsmithError::config(format!(
                "cannot resample {} data into finer {} bars",
                upstream.timeframe(),
                config.timeframe
            )));
        }
        let bucketing = Bucketing::for_target(config.timeframe, config.compression)?;
        if bucketing == Bucketing::Count && config.calendar.is_some() {
            return Err(BarsmithError::config(
                "a trading calendar has no effect on tick-count bars",
            ));
        }
        let name = format!(
            "{}/{}x{}",
            upstream.name(),
            config.timeframe,
            config.compression
        );
        Ok(Self {
            upstream,
            closes_per_bar: bucketing.closes_per_bar(config.compression),
            bucketing,
            config,
            name,
            state: ResamplerState::default(),
            current: Bar::default(),
        })
    }

    pub fn config(&self) -> &ResamplerConfig {
        &self.config
    }

    pub fn state(&self) -> &ResamplerState {
        &self.state
    }

    pub fn upstream(&self) -> &F {
        &self.upstream
    }

    /// Drops the open bar, pending output and counters. The upstream is
    /// left alone.
    pub fn reset(&mut self) {
        self.state.reset();
        self.current = Bar::default();
    }

    fn consume(&mut self, sample: &Bar) -> Result<(), BarsmithError> {
        let t = sample.timestamp;
        if let Some(last) = self.state.last_sample {
            if t < last {
                return Err(BarsmithError::stream(
                    self.upstream.name(),
                    format!("sample at {t} precedes previous sample at {last}"),
                ));
            }
        }
        self.state.last_sample = Some(t);
        tracing::trace!(feed = %self.name, %t, close = sample.close, "sample");

        if self.bucketing == Bucketing::Count {
            self.absorb(sample);
            self.close_subperiod(t);
            return Ok(());
        }

        let edge_starts_next = self.config.tick_edge_start;
        if let Some(boundary) = self.state.boundary {
            if t > boundary || (t == boundary && edge_starts_next) {
                self.close_subperiod(boundary);
            }
        }

        let boundary = match self.state.boundary {
            Some(b) => b,
            None => {
                // a repeat of the instant that just closed a bucket opens the next one
                let repeats_close = self.state.last_closed == Some(t);
                let b = self.bucket_end(t, edge_starts_next || repeats_close)?;
                self.state.boundary = Some(b);
                b
            }
        };
        self.absorb(sample);

        if t == boundary && !edge_starts_next {
            self.close_subperiod(boundary);
        }
        Ok(())
    }

    fn bucket_end(&self, t: NaiveDateTime, edge: bool) -> Result<NaiveDateTime, BarsmithError> {
        let calendar = self.config.calendar.as_deref();
        match self.bucketing {
            Bucketing::Grid { width } => boundary::grid_bucket_end(t, width, edge, calendar),
            Bucketing::Count | Bucketing::Daily => boundary::daily_bucket_end(t, edge, calendar),
        }
    }

    fn absorb(&mut self, sample: &Bar) {
        match self.state.bar.as_mut() {
            Some(bar) => bar.absorb(sample),
            None => {
                tracing::debug!(
                    feed = %self.name,
                    t = %sample.timestamp,
                    open = sample.open,
                    "bar opened"
                );
                self.state.bar = Some(*sample);
            }
        }
    }

    /// Closes the open sub-period at `boundary`. Every `closes_per_bar`-th
    /// close finalizes the bar; earlier ones let it keep accumulating.
    fn close_subperiod(&mut self, boundary: NaiveDateTime) {
        self.state.boundary = None;
        self.state.last_closed = Some(boundary);
        self.state.subperiods += 1;
        if self.state.subperiods < self.closes_per_bar {
            return;
        }
        self.state.subperiods = 0;
        if let Some(mut bar) = self.state.bar.take() {
            bar.timestamp = self.stamp(boundary);
            tracing::debug!(
                feed = %self.name,
                t = %bar.timestamp,
                open = bar.open,
                close = bar.close,
                "bar closed"
            );
            self.state.pending.push_back(bar);
        }
    }

    fn stamp(&self, boundary: NaiveDateTime) -> NaiveDateTime {
        match self.bucketing {
            Bucketing::Grid { .. } if self.config.calendar.is_none() => {
                boundary::grid_stamp(boundary)
            }
            _ => boundary,
        }
    }

    fn close_on_clock(&mut self) {
        if self.bucketing == Bucketing::Count || !self.upstream.is_live() {
            return;
        }
        let (Some(now), Some(boundary)) = (self.upstream.clock_time(), self.state.boundary) else {
            return;
        };
        if self.state.bar.is_some() && now > boundary {
            tracing::debug!(feed = %self.name, %now, %boundary, "bucket closed by clock");
            self.close_subperiod(boundary);
        }
    }

    fn finish(&mut self) -> Result<Poll<Bar>, BarsmithError> {
        self.state.upstream_done = true;
        self.state.boundary = None;
        self.state.subperiods = 0;
        if let Some(partial) = self.state.bar.take() {
            tracing::debug!(
                feed = %self.name,
                t = %partial.timestamp,
                "discarding partial bar at stream end"
            );
            if self.config.fail_on_partial {
                return Err(BarsmithError::stream(
                    self.upstream.name(),
                    format!(
                        "exhausted with a partial bar open since {}",
                        partial.timestamp
                    ),
                ));
            }
        }
        tracing::info!(feed = %self.name, "resampled stream exhausted");
        Ok(Poll::Exhausted)
    }

    fn pop_pending(&mut self) -> Option<Bar> {
        let bar = self.state.pending.pop_front()?;
        self.current = bar;
        Some(bar)
    }
}

impl<F: Feed> Feed for Resampler<F> {
    fn name(&self) -> &str {
        &self.name
    }

    /// Starts the upstream and clears all state, so a restarted resampler
    /// replays identically.
    fn start(&mut self) {
        self.upstream.start();
        self.reset();
    }

    fn poll(&mut self) -> Result<Poll<Bar>, BarsmithError> {
        if let Some(bar) = self.pop_pending() {
            return Ok(Poll::Ready(bar));
        }
        if self.state.upstream_done {
            return Ok(Poll::Exhausted);
        }
        match self.upstream.poll()? {
            Poll::Ready(sample) => self.consume(&sample)?,
            Poll::Waiting => self.close_on_clock(),
            Poll::Exhausted => return self.finish(),
        }
        Ok(match self.pop_pending() {
            Some(bar) => Poll::Ready(bar),
            None => Poll::Waiting,
        })
    }

    fn is_live(&self) -> bool {
        self.upstream.is_live()
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
        self.upstream.clock_time()
    }
}
