// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB Reporter CLI
//!
//! Report host and process metrics to InfluxDB at a fixed interval.
//!
//! # Usage
//!
//! ```bash
//! # Report every 10 seconds to a local InfluxDB
//! influx-reporter --database metrics
//!
//! # Load settings from YAML, override the interval, add a tag
//! influx-reporter --config reporter.yaml --interval 30 --tag host=server01
//!
//! # Print one payload instead of sending it
//! influx-reporter --database metrics --once --dry-run
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use influx_reporter::config::{InfluxDbConfig, ReportingConfig};
use influx_reporter::{
    HttpWriter, InfluxDbReporter, MetricRegistry, ReporterConfig, ScheduledReporter, TickOutcome,
    WriteError, Writer,
};
use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "influx-reporter")]
#[command(author = "naskel.com")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Report host and process metrics to InfluxDB")]
#[command(long_about = None)]
struct Cli {
    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// InfluxDB base URL
    #[arg(short, long)]
    url: Option<String>,

    /// Target database
    #[arg(short, long)]
    database: Option<String>,

    /// Target retention policy ("default" omits it)
    #[arg(short, long)]
    retention_policy: Option<String>,

    /// Seconds between two reports (at most one day)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Static tag attached to every line (repeatable)
    #[arg(short, long = "tag", value_name = "KEY=VALUE", value_parser = parse_tag)]
    tags: Vec<(String, String)>,

    /// Basic auth user name
    #[arg(long)]
    username: Option<String>,

    /// Basic auth password
    #[arg(long)]
    password: Option<String>,

    /// Report once and exit
    #[arg(long)]
    once: bool,

    /// Print payloads to stdout instead of sending them
    #[arg(long)]
    dry_run: bool,
}

/// Prints payloads instead of sending them.
struct StdoutWriter;

impl Writer for StdoutWriter {
    fn write(
        &self,
        payload: &str,
        database: &str,
        retention_policy: Option<&str>,
    ) -> Result<(), WriteError> {
        println!(
            "# db={} rp={}",
            database,
            retention_policy.unwrap_or("default")
        );
        print!("{}", payload);
        Ok(())
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;

    let registry = Arc::new(MetricRegistry::new());
    register_system_gauges(&registry).context("Failed to register gauges")?;

    let writer: Box<dyn Writer> = if cli.dry_run {
        Box::new(StdoutWriter)
    } else {
        Box::new(HttpWriter::new(config.writer_config()).context("Failed to create HTTP writer")?)
    };
    let reporter = InfluxDbReporter::new(writer, config.reporter_options());
    let mut scheduled = ScheduledReporter::new(reporter, registry)
        .with_final_report(config.reporter.report_on_stop);

    if cli.once {
        let summary = scheduled.run_once();
        log::info!(
            "Reported {} lines ({} bytes): {:?}",
            summary.lines,
            summary.payload_bytes,
            summary.outcome
        );
        if summary.outcome == TickOutcome::Failed {
            bail!("write to InfluxDB failed");
        }
        return Ok(());
    }

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc_handler(stop_tx)?;

    let handle = scheduled
        .start(config.interval())
        .context("Failed to start reporter thread")?;

    // Block until Ctrl+C
    let _ = stop_rx.recv();

    let stats = match handle.join() {
        Ok(stats) => stats,
        Err(_) => bail!("reporter thread panicked"),
    };
    log::info!(
        "Reporter shutdown complete: {} ticks, {} lines, {} writes ({} failed)",
        stats.ticks,
        stats.lines,
        stats.writes,
        stats.failed_writes
    );

    Ok(())
}

/// Merge the optional config file with command-line overrides.
fn build_config(cli: &Cli) -> Result<ReporterConfig> {
    let mut config = match &cli.config {
        Some(path) => ReporterConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let Some(database) = &cli.database else {
                bail!("either --config or --database is required");
            };
            ReporterConfig {
                influxdb: InfluxDbConfig::default(),
                reporter: ReportingConfig::new(database.clone()),
            }
        }
    };

    if let Some(url) = &cli.url {
        config.influxdb.url = url.clone();
    }
    if let Some(username) = &cli.username {
        config.influxdb.username = Some(username.clone());
    }
    if let Some(password) = &cli.password {
        config.influxdb.password = Some(password.clone());
    }
    if let Some(database) = &cli.database {
        config.reporter.database = database.clone();
    }
    if let Some(rp) = &cli.retention_policy {
        config.reporter.retention_policy = rp.clone();
    }
    if let Some(interval) = cli.interval {
        config.reporter.interval_secs = interval;
    }
    for (key, value) in &cli.tags {
        config.reporter.tags.insert(key.clone(), value.clone());
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Parse a `KEY=VALUE` tag argument.
fn parse_tag(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() && !value.is_empty() => {
            Ok((key.to_string(), value.to_string()))
        }
        _ => Err(format!("expected non-empty KEY=VALUE, got '{}'", s)),
    }
}

fn register_system_gauges(registry: &MetricRegistry) -> Result<()> {
    let started = Instant::now();
    registry.register_gauge("process.uptime", move || started.elapsed().as_secs_f64())?;
    registry.register_gauge("process.threads", || {
        read_proc("/proc/self/status").and_then(|s| parse_status_field(&s, "Threads"))
    })?;

    for (name, index) in [
        ("system.load.1m", 0),
        ("system.load.5m", 1),
        ("system.load.15m", 2),
    ] {
        registry.register_gauge(name, move || {
            read_proc("/proc/loadavg")
                .and_then(|s| parse_loadavg(&s))
                .map(|load| load[index])
        })?;
    }

    for (name, key) in [
        ("system.memory.total", "MemTotal"),
        ("system.memory.available", "MemAvailable"),
    ] {
        registry.register_gauge(name, move || {
            read_proc("/proc/meminfo")
                .and_then(|s| parse_meminfo_bytes(&s, key))
                .map(|bytes| i64::try_from(bytes).unwrap_or(i64::MAX))
        })?;
    }

    Ok(())
}

/// Unavailable readings become `None`, which the reporter skips.
fn read_proc(path: &str) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            log::debug!("Cannot read {}: {}", path, e);
            None
        }
    }
}

/// Parse the three load averages of `/proc/loadavg`.
fn parse_loadavg(content: &str) -> Option<[f64; 3]> {
    let mut it = content.split_whitespace().map(|v| v.parse::<f64>().ok());
    Some([it.next()??, it.next()??, it.next()??])
}

/// Parse a `kB` entry of `/proc/meminfo`, in bytes.
fn parse_meminfo_bytes(content: &str, key: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let (k, rest) = line.split_once(':')?;
        if k.trim() != key {
            return None;
        }
        let kb = rest.split_whitespace().next()?.parse::<u64>().ok()?;
        Some(kb * 1024)
    })
}

/// Parse a numeric field of `/proc/self/status`.
fn parse_status_field(content: &str, key: &str) -> Option<i64> {
    content.lines().find_map(|line| {
        let (k, v) = line.split_once(':')?;
        if k.trim() != key {
            return None;
        }
        v.trim().parse::<i64>().ok()
    })
}

/// Setup Ctrl+C handler.
fn ctrlc_handler(stop_tx: mpsc::Sender<()>) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C, shutting down...");
        let _ = stop_tx.send(());
    })
    .context("Failed to install Ctrl+C handler")
}
