// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Event rate meters.
//!
//! The 1-, 5- and 15-minute rates are exponentially weighted moving averages
//! updated every [`TICK_INTERVAL`], in the manner of the UNIX load average.
//! Ticks are applied lazily whenever the meter is marked or read.

use super::clock::{Clock, MonotonicClock};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Interval between two moving-average updates.
pub const TICK_INTERVAL: Duration = Duration::from_secs(5);

const TICK_INTERVAL_NANOS: u64 = 5_000_000_000;

/// Exponentially weighted moving average of a per-second rate.
#[derive(Debug, Clone)]
struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    fn for_minutes(minutes: f64) -> Self {
        let interval_secs = TICK_INTERVAL.as_secs_f64();
        Self {
            alpha: 1.0 - (-interval_secs / 60.0 / minutes).exp(),
            rate: 0.0,
            initialized: false,
        }
    }

    /// Fold in the events counted during one tick interval.
    fn tick(&mut self, count: u64) {
        let instant_rate = count as f64 / TICK_INTERVAL.as_secs_f64();
        if self.initialized {
            self.rate += self.alpha * (instant_rate - self.rate);
        } else {
            self.rate = instant_rate;
            self.initialized = true;
        }
    }
}

#[derive(Debug)]
struct MeterState {
    uncounted: u64,
    last_tick: u64,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

/// Point-in-time readout of a [`Meter`]. Rates are events per second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeterSnapshot {
    pub count: u64,
    pub mean_rate: f64,
    pub one_minute_rate: f64,
    pub five_minute_rate: f64,
    pub fifteen_minute_rate: f64,
}

/// Measures the rate at which events occur.
#[derive(Debug)]
pub struct Meter {
    clock: Arc<dyn Clock>,
    start: u64,
    count: AtomicU64,
    state: Mutex<MeterState>,
}

impl Meter {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let start = clock.tick();
        Self {
            clock,
            start,
            count: AtomicU64::new(0),
            state: Mutex::new(MeterState {
                uncounted: 0,
                last_tick: start,
                m1: Ewma::for_minutes(1.0),
                m5: Ewma::for_minutes(5.0),
                m15: Ewma::for_minutes(15.0),
            }),
        }
    }

    /// Record one event.
    pub fn mark(&self) {
        self.mark_n(1);
    }

    /// Record `n` events.
    pub fn mark_n(&self, n: u64) {
        let mut state = self.state.lock();
        self.tick_if_necessary(&mut state);
        state.uncounted += n;
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Number of events recorded.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Mean rate since creation.
    pub fn mean_rate(&self) -> f64 {
        self.mean_rate_at(self.clock.tick())
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.snapshot().one_minute_rate
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.snapshot().five_minute_rate
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.snapshot().fifteen_minute_rate
    }

    /// Read the count and all rates at once.
    pub fn snapshot(&self) -> MeterSnapshot {
        let mut state = self.state.lock();
        self.tick_if_necessary(&mut state);
        let now = self.clock.tick();
        MeterSnapshot {
            count: self.count(),
            mean_rate: self.mean_rate_at(now),
            one_minute_rate: state.m1.rate,
            five_minute_rate: state.m5.rate,
            fifteen_minute_rate: state.m15.rate,
        }
    }

    fn mean_rate_at(&self, now: u64) -> f64 {
        let count = self.count();
        let elapsed = now.saturating_sub(self.start);
        if count == 0 || elapsed == 0 {
            return 0.0;
        }
        count as f64 / (elapsed as f64 / 1e9)
    }

    fn tick_if_necessary(&self, state: &mut MeterState) {
        let now = self.clock.tick();
        let age = now.saturating_sub(state.last_tick);
        if age < TICK_INTERVAL_NANOS {
            return;
        }
        state.last_tick = now - age % TICK_INTERVAL_NANOS;

        // Events land in the first elapsed interval, later ones decay.
        let ticks = age / TICK_INTERVAL_NANOS;
        for _ in 0..ticks {
            let count = std::mem::take(&mut state.uncounted);
            state.m1.tick(count);
            state.m5.tick(count);
            state.m15.tick(count);
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}
