use anyhow::Result;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::models::SearchResultSet;

/// Status lines shown while a search is in flight, advanced one step per
/// interval and parked on the last one until the search settles.
pub const SEARCH_PHASES: [&str; 4] = [
    "Initializing AI agent...",
    "Scanning LinkedIn, Indeed, Glassdoor...",
    "Ranking results by match score...",
    "Finalizing best matches...",
];

pub const PHASE_INTERVAL: Duration = Duration::from_millis(2500);

/// Which phase message applies after `elapsed`: one step per interval,
/// capped at the last message, no wraparound.
pub fn phase_index(elapsed: Duration, interval: Duration, phases: usize) -> usize {
    if phases == 0 {
        return 0;
    }
    let step = (elapsed.as_millis() / interval.as_millis().max(1)) as usize;
    step.min(phases - 1)
}

/// Clock for the phase messages. A value owned by the submitting loop, so
/// tearing the loop down drops the ticker with it; there is no timer to
/// leak.
pub struct ProgressTicker {
    started: Instant,
    interval: Duration,
    phases: &'static [&'static str],
}

impl ProgressTicker {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            interval: PHASE_INTERVAL,
            phases: &SEARCH_PHASES,
        }
    }

    pub fn current_index(&self) -> usize {
        phase_index(self.started.elapsed(), self.interval, self.phases.len())
    }

    pub fn current_message(&self) -> &'static str {
        self.phases[self.current_index()]
    }

    /// Fraction of the message list reached, for a progress bar.
    pub fn fraction(&self) -> f64 {
        (self.current_index() + 1) as f64 / self.phases.len() as f64
    }
}

/// One in-flight search. The request runs on its own thread and reports
/// through a single-shot channel; the submitting loop polls between input
/// events. Dropping the task drops the receiver, so a worker that finishes
/// after teardown sends into the void and its result is discarded --
/// nothing ever lands on a view that went away. Submitting again replaces
/// the task wholesale: last request wins.
pub struct SearchTask {
    rx: Receiver<Result<SearchResultSet>>,
}

impl SearchTask {
    pub fn spawn<F>(request: F) -> Self
    where
        F: FnOnce() -> Result<SearchResultSet> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            // Send fails only when the view is gone; the result is dropped.
            let _ = tx.send(request());
        });
        Self { rx }
    }

    /// Non-blocking check for the outcome. `None` while still in flight.
    pub fn poll(&self) -> Option<Result<SearchResultSet>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                Some(Err(anyhow::anyhow!("Search worker exited without a result")))
            }
        }
    }

    /// Block until the worker settles. Used by the plain CLI path, which has
    /// no other input to service while waiting.
    pub fn wait(self) -> Result<SearchResultSet> {
        match self.rx.recv() {
            Ok(outcome) => outcome,
            Err(_) => Err(anyhow::anyhow!("Search worker exited without a result")),
        }
    }
}
