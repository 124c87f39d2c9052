// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic reporting on a background thread.
//!
//! Ticks run sequentially on one thread and never overlap. A tick that
//! overruns the interval delays the next one instead of queueing it.

use crate::metrics::MetricRegistry;
use crate::reporter::{InfluxDbReporter, ReporterStats, TickSummary};
use crate::writer::Writer;
use parking_lot::{Condvar, Mutex};
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Stop signal shared between a [`ReporterHandle`] and its thread.
#[derive(Debug, Default)]
struct StopSignal {
    stopped: Mutex<bool>,
    condvar: Condvar,
}

impl StopSignal {
    fn stop(&self) {
        *self.stopped.lock() = true;
        self.condvar.notify_all();
    }

    /// Sleep until `deadline` or until stopped. Returns `true` if stopped.
    fn wait_until(&self, deadline: Instant) -> bool {
        let mut stopped = self.stopped.lock();
        while !*stopped {
            if self.condvar.wait_until(&mut stopped, deadline).timed_out() {
                break;
            }
        }
        *stopped
    }
}

/// Reports a registry's metrics at a fixed interval.
pub struct ScheduledReporter<W: Writer> {
    reporter: InfluxDbReporter<W>,
    registry: Arc<MetricRegistry>,
    report_on_stop: bool,
}

impl<W: Writer + 'static> ScheduledReporter<W> {
    pub fn new(reporter: InfluxDbReporter<W>, registry: Arc<MetricRegistry>) -> Self {
        Self {
            reporter,
            registry,
            report_on_stop: false,
        }
    }

    /// Send one last report when stopped.
    pub fn with_final_report(mut self, enabled: bool) -> Self {
        self.report_on_stop = enabled;
        self
    }

    pub fn reporter(&self) -> &InfluxDbReporter<W> {
        &self.reporter
    }

    /// Run a single tick on the calling thread.
    pub fn run_once(&mut self) -> TickSummary {
        self.reporter.report(&self.registry.snapshot())
    }

    /// Start reporting every `interval` on a new thread.
    ///
    /// The first report happens one interval after the call.
    pub fn start(self, interval: Duration) -> io::Result<ReporterHandle> {
        if interval.is_zero() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "reporting interval must be non-zero",
            ));
        }
        if Instant::now().checked_add(interval).is_none() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("reporting interval {:?} is too long", interval),
            ));
        }

        let signal = Arc::new(StopSignal::default());
        let thread_signal = signal.clone();
        let thread = thread::Builder::new()
            .name("influx-reporter".to_string())
            .spawn(move || self.run(interval, &thread_signal))?;

        Ok(ReporterHandle {
            signal,
            thread: Some(thread),
        })
    }

    fn run(mut self, interval: Duration, signal: &StopSignal) -> ReporterStats {
        log::info!(
            "Reporting to InfluxDB database '{}' every {:?}",
            self.reporter.options().database,
            interval
        );

        let mut last = Instant::now();
        loop {
            let Some(deadline) = last.checked_add(interval) else {
                log::error!("Reporting interval {:?} overflows the clock, stopping", interval);
                break;
            };
            if signal.wait_until(deadline) {
                break;
            }
            self.run_once();

            let now = Instant::now();
            last = match deadline.checked_add(interval) {
                Some(following) if following > now => deadline,
                _ => {
                    log::debug!("Report overran the {:?} interval, skipping missed ticks", interval);
                    now
                }
            };
        }

        if self.report_on_stop {
            self.run_once();
        }

        let stats = self.reporter.stats();
        log::info!(
            "InfluxDB reporter stopped after {} ticks ({} failed writes)",
            stats.ticks,
            stats.failed_writes
        );
        stats
    }
}

/// Handle to a running [`ScheduledReporter`]. Dropping it stops the thread.
#[derive(Debug)]
pub struct ReporterHandle {
    signal: Arc<StopSignal>,
    thread: Option<JoinHandle<ReporterStats>>,
}

impl ReporterHandle {
    /// Ask the reporting thread to stop. Does not wait for it.
    pub fn stop(&self) {
        self.signal.stop();
    }

    /// Stop the reporting thread and wait for it to finish.
    pub fn join(mut self) -> thread::Result<ReporterStats> {
        self.stop();
        match self.thread.take() {
            Some(thread) => thread.join(),
            None => Ok(ReporterStats::default()),
        }
    }
}

impl Drop for ReporterHandle {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("InfluxDB reporter thread panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::{ReporterOptions, TickOutcome};
    use crate::writer::WriteError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingWriter {
        writes: AtomicUsize,
    }

    impl Writer for CountingWriter {
        fn write(&self, _: &str, _: &str, _: Option<&str>) -> Result<(), WriteError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn scheduled(writer: Arc<CountingWriter>) -> ScheduledReporter<Arc<CountingWriter>> {
        let registry = Arc::new(MetricRegistry::new());
        registry.counter("requests").expect("counter").inc();
        let reporter = InfluxDbReporter::new(writer, ReporterOptions::new("metrics"));
        ScheduledReporter::new(reporter, registry)
    }

    #[test]
    fn test_run_once() {
        let writer = Arc::new(CountingWriter::default());
        let mut scheduled = scheduled(writer.clone());

        let summary = scheduled.run_once();
        assert_eq!(summary.outcome, TickOutcome::Delivered);
        assert_eq!(summary.lines, 1);
        assert_eq!(writer.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_interval_rejected() {
        let writer = Arc::new(CountingWriter::default());
        let err = scheduled(writer).start(Duration::ZERO).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }

    #[test]
    fn test_unrepresentable_interval_rejected() {
        let writer = Arc::new(CountingWriter::default());
        let err = scheduled(writer.clone())
            .start(Duration::from_secs(u64::MAX))
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert_eq!(writer.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_longest_configured_interval_starts_and_stops() {
        let config = crate::config::ReporterConfig::from_yaml(
            "reporter:\n  database: m\n  interval_secs: 86400\n",
        )
        .expect("config");
        let writer = Arc::new(CountingWriter::default());
        let handle = scheduled(writer)
            .start(config.interval())
            .expect("start");

        let stats = handle.join().expect("reporter thread must not panic");
        assert_eq!(stats.ticks, 0);
    }

    #[test]
    fn test_stop_is_prompt() {
        let writer = Arc::new(CountingWriter::default());
        let handle = scheduled(writer.clone())
            .start(Duration::from_secs(3600))
            .expect("start");

        let started = Instant::now();
        let stats = handle.join().expect("join");
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(stats.ticks, 0);
        assert_eq!(writer.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_final_report_on_stop() {
        let writer = Arc::new(CountingWriter::default());
        let handle = scheduled(writer.clone())
            .with_final_report(true)
            .start(Duration::from_secs(3600))
            .expect("start");

        let stats = handle.join().expect("join");
        assert_eq!(stats.ticks, 1);
        assert_eq!(writer.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_periodic_ticks() {
        let writer = Arc::new(CountingWriter::default());
        let handle = scheduled(writer.clone())
            .start(Duration::from_millis(10))
            .expect("start");

        let deadline = Instant::now() + Duration::from_secs(5);
        while writer.writes.load(Ordering::SeqCst) < 3 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        drop(handle);

        assert!(writer.writes.load(Ordering::SeqCst) >= 3);
    }
}
