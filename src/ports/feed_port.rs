//! Sample stream port: the pull contract every source and every resampled
//! output implements.

use crate::domain::bar::Bar;
use crate::domain::error::BarsmithError;
use crate::domain::timeframe::{Compression, Timeframe};
use chrono::NaiveDateTime;

/// Result of polling a feed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Poll<T> {
    /// A new sample is available and the cursor has advanced.
    Ready(T),
    /// Nothing new yet. The cursor did not move; poll again later.
    Waiting,
    /// Terminal. No later poll returns `Ready`.
    Exhausted,
}

impl<T> Poll<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Poll::Ready(_))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Poll::Exhausted)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Poll<U> {
        match self {
            Poll::Ready(v) => Poll::Ready(f(v)),
            Poll::Waiting => Poll::Waiting,
            Poll::Exhausted => Poll::Exhausted,
        }
    }
}

pub trait Feed {
    fn name(&self) -> &str;

    /// Called once before the first poll of a run. Captures the clock epoch
    /// and rewinds any cursor.
    fn start(&mut self);

    fn poll(&mut self) -> Result<Poll<Bar>, BarsmithError>;

    /// Whether `Waiting` should keep the pipeline alive under real-time
    /// pacing, as opposed to a backtest or backfill source.
    fn is_live(&self) -> bool;

    /// The sample delivered by the last `Ready`.
    fn current(&self) -> &Bar;

    fn timeframe(&self) -> Timeframe;

    fn compression(&self) -> Compression;

    /// Reading of the clock pacing this feed, if it is clock-paced.
    fn clock_time(&self) -> Option<NaiveDateTime> {
        None
    }
}

impl<F: Feed + ?Sized> Feed for Box<F> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn start(&mut self) {
        (**self).start()
    }

    fn poll(&mut self) -> Result<Poll<Bar>, BarsmithError> {
        (**self).poll()
    }

    fn is_live(&self) -> bool {
        (**self).is_live()
    }

    fn current(&self) -> &Bar {
        (**self).current()
    }

    fn timeframe(&self) -> Timeframe {
        (**self).timeframe()
    }

    fn compression(&self) -> Compression {
        (**self).compression()
    }

    fn clock_time(&self) -> Option<NaiveDateTime> {
        (**self).clock_time()
    }
}
