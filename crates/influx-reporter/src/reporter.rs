// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Snapshot aggregation.
//!
//! Connects filtering, field derivation, Line Protocol encoding and
//! delivery into a single reporting tick.
//!
//! ```text
//! MetricSet --> MetricFilter --> FieldMapper --> PayloadBuffer --> Writer
//! ```

use crate::buffer::{CapacityHint, PayloadBuffer};
use crate::filter::{AcceptAll, MetricFilter};
use crate::influx::TagSet;
use crate::mapping::FieldMapper;
use crate::metrics::{MetricRef, MetricSet, TimeUnit};
use crate::writer::{self, Writer};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reporter settings.
#[derive(Clone)]
pub struct ReporterOptions {
    /// Target database.
    pub database: String,
    /// Target retention policy. `"default"` omits it from the write.
    pub retention_policy: String,
    /// Unit of reported rates (events per unit).
    pub rate_unit: TimeUnit,
    /// Unit of reported timer durations.
    pub duration_unit: TimeUnit,
    /// Tags attached to every line.
    pub tags: TagSet,
    /// Metrics to report.
    pub filter: Arc<dyn MetricFilter>,
}

impl ReporterOptions {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            retention_policy: writer::DEFAULT_RETENTION_POLICY.to_string(),
            rate_unit: TimeUnit::Seconds,
            duration_unit: TimeUnit::Milliseconds,
            tags: TagSet::new(),
            filter: Arc::new(AcceptAll),
        }
    }

    pub fn with_retention_policy(mut self, retention_policy: impl Into<String>) -> Self {
        self.retention_policy = retention_policy.into();
        self
    }

    pub fn with_rate_unit(mut self, unit: TimeUnit) -> Self {
        self.rate_unit = unit;
        self
    }

    pub fn with_duration_unit(mut self, unit: TimeUnit) -> Self {
        self.duration_unit = unit;
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_filter(mut self, filter: impl MetricFilter + 'static) -> Self {
        self.filter = Arc::new(filter);
        self
    }
}

impl fmt::Debug for ReporterOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReporterOptions")
            .field("database", &self.database)
            .field("retention_policy", &self.retention_policy)
            .field("rate_unit", &self.rate_unit)
            .field("duration_unit", &self.duration_unit)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}

/// What happened to a tick's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No line was produced, nothing was written.
    Empty,
    Delivered,
    /// The writer failed; the report is lost.
    Failed,
}

/// Result of one reporting tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickSummary {
    pub lines: usize,
    pub payload_bytes: usize,
    pub outcome: TickOutcome,
}

/// Cumulative reporter statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReporterStats {
    pub ticks: u64,
    pub lines: u64,
    pub writes: u64,
    pub failed_writes: u64,
}

/// Turns metric snapshots into Line Protocol payloads and hands them to a
/// [`Writer`].
pub struct InfluxDbReporter<W: Writer> {
    writer: W,
    options: ReporterOptions,
    mapper: FieldMapper,
    capacity: CapacityHint,
    stats: ReporterStats,
}

impl<W: Writer> InfluxDbReporter<W> {
    pub fn new(writer: W, options: ReporterOptions) -> Self {
        let mapper = FieldMapper::new(options.rate_unit, options.duration_unit);
        Self {
            writer,
            options,
            mapper,
            capacity: CapacityHint::new(),
            stats: ReporterStats::default(),
        }
    }

    pub fn options(&self) -> &ReporterOptions {
        &self.options
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn stats(&self) -> ReporterStats {
        self.stats
    }

    /// Current payload capacity hint, in bytes.
    pub fn capacity_hint(&self) -> usize {
        self.capacity.get()
    }

    /// Report `metrics` stamped with the current wall-clock time.
    pub fn report(&mut self, metrics: &MetricSet) -> TickSummary {
        self.report_at(metrics, now_millis())
    }

    /// Report `metrics` with every line stamped `timestamp_ms`.
    ///
    /// Unencodable metrics are skipped. Write failures are logged and
    /// never propagated.
    pub fn report_at(&mut self, metrics: &MetricSet, timestamp_ms: i64) -> TickSummary {
        self.stats.ticks += 1;
        let payload = self.build_payload(metrics, timestamp_ms);
        let lines = payload.lines();
        let payload_bytes = payload.len();
        self.capacity.observe(payload_bytes);
        self.stats.lines += lines as u64;

        if payload.is_empty() {
            log::debug!("No metrics to report at {}", timestamp_ms);
            return TickSummary {
                lines,
                payload_bytes,
                outcome: TickOutcome::Empty,
            };
        }

        log::trace!("Writing {} lines to '{}':\n{}", lines, self.options.database, payload.as_str());
        let result = self.writer.write(
            payload.as_str(),
            &self.options.database,
            Some(&self.options.retention_policy),
        );

        self.stats.writes += 1;
        let outcome = match result {
            Ok(()) => TickOutcome::Delivered,
            Err(e) => {
                self.stats.failed_writes += 1;
                log::warn!(
                    "Unable to report {} metrics to InfluxDB database '{}': {}",
                    lines,
                    self.options.database,
                    e
                );
                TickOutcome::Failed
            }
        };

        TickSummary {
            lines,
            payload_bytes,
            outcome,
        }
    }

    /// Encode every accepted metric into a fresh buffer.
    pub fn build_payload(&self, metrics: &MetricSet, timestamp_ms: i64) -> PayloadBuffer {
        let mut buf = PayloadBuffer::new(self.capacity);
        let filter = self.options.filter.as_ref();
        let tags = &self.options.tags;
        let mapper = &self.mapper;

        for (name, gauge) in &metrics.gauges {
            if !filter.matches(name, MetricRef::Gauge(gauge.as_ref())) {
                continue;
            }
            let reading = gauge.value();
            match mapper.gauge_fields(&reading) {
                Ok(fields) => {
                    buf.push_point(name, &fields, tags, timestamp_ms);
                }
                Err(e) => log::debug!("Skipping gauge '{}': {}", name, e),
            }
        }

        for (name, counter) in &metrics.counters {
            if filter.matches(name, MetricRef::Counter(counter)) {
                buf.push_point(name, &mapper.counter_fields(counter), tags, timestamp_ms);
            }
        }

        for (name, histogram) in &metrics.histograms {
            if filter.matches(name, MetricRef::Histogram(histogram)) {
                let fields = mapper.histogram_fields(histogram.count(), &histogram.snapshot());
                buf.push_point(name, &fields, tags, timestamp_ms);
            }
        }

        for (name, meter) in &metrics.meters {
            if filter.matches(name, MetricRef::Meter(meter)) {
                buf.push_point(name, &mapper.meter_fields(&meter.snapshot()), tags, timestamp_ms);
            }
        }

        for (name, timer) in &metrics.timers {
            if filter.matches(name, MetricRef::Timer(timer)) {
                let fields = mapper.timer_fields(&timer.rates(), &timer.snapshot());
                buf.push_point(name, &fields, tags, timestamp_ms);
            }
        }

        buf
    }
}

impl<W: Writer> fmt::Debug for InfluxDbReporter<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfluxDbReporter")
            .field("options", &self.options)
            .field("capacity", &self.capacity)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
