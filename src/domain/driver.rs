//! Single-threaded pull loop.

use crate::domain::error::BarsmithError;
use crate::domain::series::BarSink;
use crate::ports::feed_port::{Feed, Poll};

/// Counters from one completed run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub polls: u64,
    pub waits: u64,
    pub bars: u64,
}

/// Starts `feed` and pulls until it is exhausted, handing every bar to
/// `sink`. `on_waiting` runs after each `Waiting` poll; live runs sleep
/// there, tests advance a manual clock.
///
/// Any error ends the run immediately and `sink.stop()` is not called.
pub fn run<F, S>(
    feed: &mut F,
    sink: &mut S,
    mut on_waiting: impl FnMut(),
) -> Result<RunSummary, BarsmithError>
where
    F: Feed + ?Sized,
    S: BarSink + ?Sized,
{
    let mut summary = RunSummary::default();
    feed.start();
    sink.start();
    tracing::debug!(feed = feed.name(), live = feed.is_live(), "run started");

    loop {
        summary.polls += 1;
        match feed.poll()? {
            Poll::Ready(bar) => {
                summary.bars += 1;
                sink.next(&bar);
            }
            Poll::Waiting => {
                summary.waits += 1;
                on_waiting();
            }
            Poll::Exhausted => break,
        }
    }

    sink.stop();
    tracing::debug!(feed = feed.name(), bars = summary.bars, polls = summary.polls, "run finished");
    Ok(summary)
}
