//! Replays an in-memory sample sequence through the feed contract.

use crate::domain::bar::Bar;
use crate::domain::error::BarsmithError;
use crate::domain::timeframe::{Compression, Timeframe};
use crate::ports::feed_port::{Feed, Poll};

/// Backtest source over pre-loaded samples. Delivers one sample per poll
/// and never waits.
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    name: String,
    timeframe: Timeframe,
    compression: Compression,
    samples: Vec<Bar>,
    cursor: usize,
    current: Bar,
}

impl ReplayFeed {
    pub fn new(
        name: impl Into<String>,
        timeframe: Timeframe,
        compression: Compression,
        samples: Vec<Bar>,
    ) -> Self {
        Self {
            name: name.into(),
            timeframe,
            compression,
            samples,
            cursor: 0,
            current: Bar::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples not yet delivered.
    pub fn remaining(&self) -> usize {
        self.samples.len() - self.cursor
    }
}

impl Feed for ReplayFeed {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) {
        self.cursor = 0;
        self.current = Bar::default();
    }

    fn poll(&mut self) -> Result<Poll<Bar>, BarsmithError> {
        match self.samples.get(self.cursor) {
            Some(bar) => {
                self.cursor += 1;
                self.current = *bar;
                Ok(Poll::Ready(*bar))
            }
            None => Ok(Poll::Exhausted),
        }
    }

    fn is_live(&self) -> bool {
        false
    }

    fn current(&self) -> &Bar {
        &self.current
    }

    fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    fn compression(&self) -> Compression {
        self.compression
    }
}
