//! Consumer side of a feed: finalized bar storage and the sink lifecycle.

use crate::domain::bar::Bar;

/// Finalized bars in delivery order, addressed by distance from the newest.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BarSeries {
    bars: Vec<Bar>,
}

impl BarSeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bar: Bar) {
        self.bars.push(bar);
    }

    /// `get(0)` is the newest bar, `get(1)` the one before it.
    pub fn get(&self, ago: usize) -> Option<&Bar> {
        let index = self.bars.len().checked_sub(ago + 1)?;
        self.bars.get(index)
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> std::slice::Iter<'_, Bar> {
        self.bars.iter()
    }

    pub fn as_slice(&self) -> &[Bar] {
        &self.bars
    }

    pub fn clear(&mut self) {
        self.bars.clear();
    }
}

impl<'a> IntoIterator for &'a BarSeries {
    type Item = &'a Bar;
    type IntoIter = std::slice::Iter<'a, Bar>;

    fn into_iter(self) -> Self::IntoIter {
        self.bars.iter()
    }
}

/// Receives the bars of one run: `start`, then `next` per bar, then `stop`
/// once the feed is exhausted.
pub trait BarSink {
    fn start(&mut self) {}
    fn next(&mut self, bar: &Bar);
    fn stop(&mut self) {}
}

/// Sink that keeps every bar it is handed.
#[derive(Debug, Clone, Default)]
pub struct BarRecorder {
    series: BarSeries,
    stopped: bool,
}

impl BarRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self) -> &BarSeries {
        &self.series
    }

    pub fn into_series(self) -> BarSeries {
        self.series
    }

    /// Whether the last run reached `stop`.
    pub fn stopped(&self) -> bool {
        self.stopped
    }
}

impl BarSink for BarRecorder {
    fn start(&mut self) {
        self.series.clear();
        self.stopped = false;
    }

    fn next(&mut self, bar: &Bar) {
        self.series.push(*bar);
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}
