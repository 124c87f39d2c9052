// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Histograms and distribution snapshots.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of most recent samples kept by a histogram unless configured
/// otherwise.
pub const DEFAULT_RESERVOIR_SIZE: usize = 1028;

/// Distribution of `i64` samples.
///
/// The total count covers every recorded sample; the statistics of a
/// [`Snapshot`] cover the most recent `reservoir_size` samples.
#[derive(Debug)]
pub struct Histogram {
    count: AtomicU64,
    window: Mutex<VecDeque<i64>>,
    reservoir_size: usize,
}

impl Histogram {
    /// Create a histogram keeping [`DEFAULT_RESERVOIR_SIZE`] samples.
    pub fn new() -> Self {
        Self::with_reservoir_size(DEFAULT_RESERVOIR_SIZE)
    }

    /// Create a histogram keeping the `size` most recent samples.
    /// A size of zero is treated as one.
    pub fn with_reservoir_size(size: usize) -> Self {
        let size = size.max(1);
        Self {
            count: AtomicU64::new(0),
            window: Mutex::new(VecDeque::with_capacity(size)),
            reservoir_size: size,
        }
    }

    /// Record a sample.
    pub fn update(&self, value: i64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        let mut window = self.window.lock();
        if window.len() == self.reservoir_size {
            window.pop_front();
        }
        window.push_back(value);
    }

    /// Total number of samples ever recorded.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Point-in-time statistics over the retained samples.
    ///
    /// Min, max, mean, std-dev and the percentiles cover only the
    /// `reservoir_size` most recent samples (1028 by default). Older samples
    /// still count towards [`count`](Self::count), which is reported
    /// alongside the snapshot.
    pub fn snapshot(&self) -> Snapshot {
        let values: Vec<i64> = self.window.lock().iter().copied().collect();
        Snapshot::new(values)
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

/// Sorted, immutable view of a set of samples.
///
/// Every statistic of an empty snapshot is zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: Vec<i64>,
}

impl Snapshot {
    pub fn new(mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self { values }
    }

    /// Sorted sample values.
    pub fn values(&self) -> &[i64] {
        &self.values
    }

    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn min(&self) -> i64 {
        self.values.first().copied().unwrap_or(0)
    }

    pub fn max(&self) -> i64 {
        self.values.last().copied().unwrap_or(0)
    }

    pub fn mean(&self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.values.iter().map(|&v| v as f64).sum();
        sum / self.values.len() as f64
    }

    /// Sample standard deviation; zero below two samples.
    pub fn std_dev(&self) -> f64 {
        let n = self.values.len();
        if n < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let sum_sq: f64 = self
            .values
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();
        (sum_sq / (n - 1) as f64).sqrt()
    }

    /// Value at `quantile` (clamped to `[0, 1]`), linearly interpolated
    /// between the two closest ranks at position `quantile * (n + 1)`.
    pub fn value(&self, quantile: f64) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 0.0;
        }
        let q = if quantile.is_nan() {
            0.0
        } else {
            quantile.clamp(0.0, 1.0)
        };

        let pos = q * (n + 1) as f64;
        let index = pos as usize;
        if index < 1 {
            return self.values[0] as f64;
        }
        if index >= n {
            return self.values[n - 1] as f64;
        }

        let lower = self.values[index - 1] as f64;
        let upper = self.values[index] as f64;
        lower + (pos - pos.floor()) * (upper - lower)
    }

    pub fn median(&self) -> f64 {
        self.value(0.5)
    }

    pub fn p75(&self) -> f64 {
        self.value(0.75)
    }

    pub fn p95(&self) -> f64 {
        self.value(0.95)
    }

    pub fn p98(&self) -> f64 {
        self.value(0.98)
    }

    pub fn p99(&self) -> f64 {
        self.value(0.99)
    }

    pub fn p999(&self) -> f64 {
        self.value(0.999)
    }
}
