// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process metric primitives.
//!
//! Five metric kinds are supported:
//!
//! | Kind        | Records                        | Reported as                         |
//! |-------------|--------------------------------|-------------------------------------|
//! | [`Gauge`]   | an instantaneous reading       | `value`                             |
//! | [`Counter`] | an up/down count               | `count`                             |
//! | [`Histogram`] | a distribution of `i64`      | count, min/max/mean, percentiles    |
//! | [`Meter`]   | event rates                    | count, mean and 1/5/15-minute rates |
//! | [`Timer`]   | durations (histogram + meter)  | rates plus duration distribution    |
//!
//! Metrics are usually obtained from a [`MetricRegistry`], whose
//! [`snapshot`](MetricRegistry::snapshot) yields the name-sorted
//! [`MetricSet`] consumed by the reporter.

mod clock;
mod counter;
mod gauge;
mod histogram;
mod meter;
mod registry;
mod timer;
mod unit;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use counter::Counter;
pub use gauge::Gauge;
pub use histogram::{Histogram, Snapshot, DEFAULT_RESERVOIR_SIZE};
pub use meter::{Meter, MeterSnapshot};
pub use registry::{MetricRegistry, RegistryError};
pub use timer::{Timer, TimerContext};
pub use unit::TimeUnit;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// The kind of a registered metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Gauge,
    Counter,
    Histogram,
    Meter,
    Timer,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Gauge => "gauge",
            MetricKind::Counter => "counter",
            MetricKind::Histogram => "histogram",
            MetricKind::Meter => "meter",
            MetricKind::Timer => "timer",
        };
        f.write_str(name)
    }
}

/// Borrowed view of a single metric, handed to filters.
#[derive(Clone, Copy)]
pub enum MetricRef<'a> {
    Gauge(&'a dyn Gauge),
    Counter(&'a Counter),
    Histogram(&'a Histogram),
    Meter(&'a Meter),
    Timer(&'a Timer),
}

impl MetricRef<'_> {
    /// The kind of the referenced metric.
    pub fn kind(&self) -> MetricKind {
        match self {
            MetricRef::Gauge(_) => MetricKind::Gauge,
            MetricRef::Counter(_) => MetricKind::Counter,
            MetricRef::Histogram(_) => MetricKind::Histogram,
            MetricRef::Meter(_) => MetricKind::Meter,
            MetricRef::Timer(_) => MetricKind::Timer,
        }
    }
}

impl fmt::Debug for MetricRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MetricRef::{}", self.kind())
    }
}

/// One reporting tick's worth of metrics, grouped by kind and sorted by name.
#[derive(Clone, Default)]
pub struct MetricSet {
    pub gauges: BTreeMap<String, Arc<dyn Gauge>>,
    pub counters: BTreeMap<String, Arc<Counter>>,
    pub histograms: BTreeMap<String, Arc<Histogram>>,
    pub meters: BTreeMap<String, Arc<Meter>>,
    pub timers: BTreeMap<String, Arc<Timer>>,
}

impl MetricSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of metrics across all kinds.
    pub fn len(&self) -> usize {
        self.gauges.len()
            + self.counters.len()
            + self.histograms.len()
            + self.meters.len()
            + self.timers.len()
    }

    /// Check if the set holds no metrics.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for MetricSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricSet")
            .field("gauges", &self.gauges.keys().collect::<Vec<_>>())
            .field("counters", &self.counters.keys().collect::<Vec<_>>())
            .field("histograms", &self.histograms.keys().collect::<Vec<_>>())
            .field("meters", &self.meters.keys().collect::<Vec<_>>())
            .field("timers", &self.timers.keys().collect::<Vec<_>>())
            .finish()
    }
}
