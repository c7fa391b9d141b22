//! Timing scope for probe measurements
//!
//! Wraps an operation and hands back how long it took next to what it
//! returned. Only `Instant` is used, so wall-clock adjustments never leak
//! into a measurement.

use std::future::Future;
use std::time::{Duration, Instant};

/// An outcome paired with the time it took to produce
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub elapsed: Duration,
    pub outcome: T,
}

impl<T> Timed<T> {
    pub fn into_parts(self) -> (Duration, T) {
        (self.elapsed, self.outcome)
    }
}

/// Time a future from first poll to completion
pub async fn timed<F>(operation: F) -> Timed<F::Output>
where
    F: Future,
{
    let stopwatch = Stopwatch::start();
    let outcome = operation.await;
    Timed {
        elapsed: stopwatch.elapsed(),
        outcome,
    }
}

/// Time a blocking closure
pub fn timed_blocking<T, F>(operation: F) -> Timed<T>
where
    F: FnOnce() -> T,
{
    let stopwatch = Stopwatch::start();
    let outcome = operation();
    Timed {
        elapsed: stopwatch.elapsed(),
        outcome,
    }
}

/// Monotonic stopwatch for measurements that stop mid-loop
#[derive(Debug, Clone, Copy)]
pub struct Stopwatch {
    started: Instant,
}

impl Stopwatch {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left of `budget`, `None` once it is spent
    pub fn remaining(&self, budget: Duration) -> Option<Duration> {
        budget.checked_sub(self.elapsed()).filter(|left| !left.is_zero())
    }
}
