//! Mutable per-stream resampler state.

use crate::domain::bar::Bar;
use chrono::NaiveDateTime;
use std::collections::VecDeque;

/// Everything a resampler mutates while consuming samples. One value per
/// stream, owned by its resampler; resetting it returns the stream to the
/// state it had before its first sample.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResamplerState {
    pub(super) bar: Option<Bar>,
    pub(super) boundary: Option<NaiveDateTime>,
    pub(super) subperiods: u32,
    pub(super) pending: VecDeque<Bar>,
    pub(super) upstream_done: bool,
    pub(super) last_sample: Option<NaiveDateTime>,
    /// Boundary of the most recent sub-period close.
    pub(super) last_closed: Option<NaiveDateTime>,
}

impl ResamplerState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_initial(&self) -> bool {
        *self == Self::default()
    }

    /// The bar being accumulated, if any.
    pub fn partial_bar(&self) -> Option<&Bar> {
        self.bar.as_ref()
    }

    /// Close of the open sub-period.
    pub fn boundary(&self) -> Option<NaiveDateTime> {
        self.boundary
    }

    /// Sub-period closes folded into the open bar so far.
    pub fn subperiods(&self) -> u32 {
        self.subperiods
    }

    /// Closed bars not yet handed out.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn upstream_done(&self) -> bool {
        self.upstream_done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn reset_restores_initial_state() {
        let t = NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 20)
            .unwrap();
        let mut state = ResamplerState {
            bar: Some(Bar::tick(t, 200.0)),
            boundary: Some(t),
            subperiods: 2,
            pending: VecDeque::from([Bar::tick(t, 199.0)]),
            upstream_done: true,
            last_sample: Some(t),
            last_closed: Some(t),
        };
        assert!(!state.is_initial());

        state.reset();

        assert!(state.is_initial());
        assert_eq!(state.partial_bar(), None);
        assert_eq!(state.boundary(), None);
        assert_eq!(state.subperiods(), 0);
        assert_eq!(state.pending(), 0);
        assert!(!state.upstream_done());
    }
}
