//! OHLCV bar representation.
//!
//! The same type carries raw samples (a tick is a bar with
//! open = high = low = close) and resampled output.

use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub open_interest: f64,
}

impl Bar {
    /// A single price update with no volume.
    pub fn tick(timestamp: NaiveDateTime, price: f64) -> Self {
        Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: 0.0,
            open_interest: 0.0,
        }
    }

    /// Folds a later sample into this bar: extends the range, takes the
    /// sample's close and open interest, accumulates volume.
    pub fn absorb(&mut self, sample: &Bar) {
        self.high = self.high.max(sample.high);
        self.low = self.low.min(sample.low);
        self.close = sample.close;
        self.volume += sample.volume;
        self.open_interest = sample.open_interest;
        self.timestamp = sample.timestamp;
    }
}
