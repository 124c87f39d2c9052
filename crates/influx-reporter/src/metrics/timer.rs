// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use super::clock::{Clock, MonotonicClock};
use super::histogram::{Histogram, Snapshot};
use super::meter::{Meter, MeterSnapshot};
use std::sync::Arc;
use std::time::Duration;

/// Rate of an operation plus the distribution of its duration.
///
/// Durations are recorded in nanoseconds.
#[derive(Debug)]
pub struct Timer {
    clock: Arc<dyn Clock>,
    meter: Meter,
    histogram: Histogram,
}

impl Timer {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            meter: Meter::with_clock(clock.clone()),
            histogram: Histogram::new(),
            clock,
        }
    }

    /// Record one completed operation.
    pub fn update(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
        self.meter.mark();
    }

    /// Start timing; the elapsed time is recorded when the returned context
    /// is stopped or dropped.
    pub fn time(&self) -> TimerContext<'_> {
        TimerContext {
            timer: self,
            start: self.clock.tick(),
            stopped: false,
        }
    }

    /// Time a closure.
    pub fn time_fn<T>(&self, f: impl FnOnce() -> T) -> T {
        let _ctx = self.time();
        f()
    }

    /// Number of recorded operations.
    pub fn count(&self) -> u64 {
        self.meter.count()
    }

    /// Duration distribution, in nanoseconds.
    pub fn snapshot(&self) -> Snapshot {
        self.histogram.snapshot()
    }

    /// Operation rates.
    pub fn rates(&self) -> MeterSnapshot {
        self.meter.snapshot()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-flight timing started by [`Timer::time`].
#[derive(Debug)]
pub struct TimerContext<'a> {
    timer: &'a Timer,
    start: u64,
    stopped: bool,
}

impl TimerContext<'_> {
    /// Record the elapsed time and return it.
    pub fn stop(mut self) -> Duration {
        self.record()
    }

    fn record(&mut self) -> Duration {
        self.stopped = true;
        let elapsed = Duration::from_nanos(self.timer.clock.tick().saturating_sub(self.start));
        self.timer.update(elapsed);
        elapsed
    }
}

impl Drop for TimerContext<'_> {
    fn drop(&mut self) {
        if !self.stopped {
            self.record();
        }
    }
}
