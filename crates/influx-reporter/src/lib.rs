// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB Metrics Reporter
//!
//! Periodically reports in-process metrics to InfluxDB 1.x using the
//! Line Protocol.
//!
//! This crate provides:
//! - Gauges, counters, histograms, meters and timers with a named registry
//! - An InfluxDB Line Protocol encoder with all-or-nothing skip semantics
//! - Per-kind field derivation with configurable rate and duration units
//! - Name filtering, static tags and a blocking HTTP writer
//! - A background scheduler and YAML-based configuration
//!
//! # Overview
//!
//! ```text
//! MetricRegistry --> MetricSet --> InfluxDbReporter --> payload --> Writer (HTTP)
//!                                  (filter, FieldMapper, encoder)
//! ```
//!
//! Reporting is best effort: metrics that cannot be encoded are skipped and
//! failed writes are logged, never propagated to the instrumented
//! application.
//!
//! ```no_run
//! use influx_reporter::{
//!     HttpWriter, HttpWriterConfig, InfluxDbReporter, MetricRegistry, ReporterOptions,
//!     ScheduledReporter,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(MetricRegistry::new());
//! registry.counter("requests")?.inc();
//!
//! let writer = HttpWriter::new(HttpWriterConfig::default())?;
//! let options = ReporterOptions::new("metrics").with_tag("host", "server01");
//! let reporter = InfluxDbReporter::new(writer, options);
//!
//! let handle = ScheduledReporter::new(reporter, registry).start(Duration::from_secs(10))?;
//! // ...
//! handle.stop();
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod config;
pub mod filter;
pub mod influx;
pub mod mapping;
pub mod metrics;
pub mod reporter;
pub mod scheduler;
pub mod writer;

pub use config::{ConfigError, ReporterConfig};
pub use filter::{AcceptAll, MetricFilter, NameFilter};
pub use influx::{FieldValue, TagSet};
pub use mapping::{FieldMapper, UnsupportedValue};
pub use metrics::{MetricRegistry, MetricSet, TimeUnit};
pub use reporter::{InfluxDbReporter, ReporterOptions, ReporterStats, TickOutcome, TickSummary};
pub use scheduler::{ReporterHandle, ScheduledReporter};
pub use writer::{HttpWriter, HttpWriterConfig, WriteError, Writer};
