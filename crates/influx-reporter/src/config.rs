// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! YAML configuration for the InfluxDB reporter.
//!
//! ```yaml
//! influxdb:
//!   url: "http://localhost:8086"   # default
//!   username: "telegraf"           # optional, enables basic auth
//!   password: "secret"
//!   connect_timeout_ms: 5000       # default
//!   request_timeout_ms: 5000       # default
//! reporter:
//!   database: "metrics"            # required
//!   retention_policy: "default"    # default, omitted from writes
//!   interval_secs: 10              # default
//!   rate_unit: seconds             # default
//!   duration_unit: milliseconds    # default
//!   report_on_stop: false          # default
//!   tags:
//!     host: "server01"
//!   filter:
//!     include: ["http.*"]
//!     exclude: ["*.debug"]
//! ```

use crate::filter::NameFilter;
use crate::influx::TagSet;
use crate::metrics::TimeUnit;
use crate::reporter::ReporterOptions;
use crate::writer::{HttpWriterConfig, DEFAULT_RETENTION_POLICY};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Top-level reporter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReporterConfig {
    /// InfluxDB connection settings.
    #[serde(default)]
    pub influxdb: InfluxDbConfig,
    /// What to report and how.
    pub reporter: ReportingConfig,
}

/// InfluxDB 1.x connection configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InfluxDbConfig {
    /// Server URL (e.g., "http://localhost:8086").
    pub url: String,
    /// Basic auth user name.
    pub username: Option<String>,
    /// Basic auth password.
    pub password: Option<String>,
    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Whole-request timeout in milliseconds.
    pub request_timeout_ms: u64,
}

impl Default for InfluxDbConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            username: None,
            password: None,
            connect_timeout_ms: 5000,
            request_timeout_ms: 5000,
        }
    }
}

/// Reporting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportingConfig {
    /// Target database.
    pub database: String,
    #[serde(default = "default_retention_policy")]
    pub retention_policy: String,
    /// Seconds between two reports.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_rate_unit")]
    pub rate_unit: TimeUnit,
    #[serde(default = "default_duration_unit")]
    pub duration_unit: TimeUnit,
    /// Send one last report on shutdown.
    #[serde(default)]
    pub report_on_stop: bool,
    /// Tags attached to every line.
    #[serde(default)]
    pub tags: TagSet,
    /// Metric name filter. Reports everything by default.
    #[serde(default)]
    pub filter: NameFilter,
}

impl ReportingConfig {
    /// Defaults for every setting except the database.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            retention_policy: default_retention_policy(),
            interval_secs: default_interval_secs(),
            rate_unit: default_rate_unit(),
            duration_unit: default_duration_unit(),
            report_on_stop: false,
            tags: TagSet::new(),
            filter: NameFilter::default(),
        }
    }
}

/// Longest accepted reporting interval, one day.
pub const MAX_INTERVAL_SECS: u64 = 86_400;

/// Longest accepted HTTP timeout, one hour.
pub const MAX_TIMEOUT_MS: u64 = 3_600_000;

fn default_retention_policy() -> String {
    DEFAULT_RETENTION_POLICY.to_string()
}

fn default_interval_secs() -> u64 {
    10
}

fn default_rate_unit() -> TimeUnit {
    TimeUnit::Seconds
}

fn default_duration_unit() -> TimeUnit {
    TimeUnit::Milliseconds
}

/// Configuration parsing errors.
#[derive(Debug)]
pub enum ConfigError {
    /// YAML parsing failed.
    Yaml(serde_yaml::Error),
    /// File I/O failed.
    Io(std::io::Error),
    /// A value is out of range.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Yaml(e) => write!(f, "YAML parse error: {}", e),
            ConfigError::Io(e) => write!(f, "I/O error: {}", e),
            ConfigError::Invalid(msg) => write!(f, "invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Yaml(e) => Some(e),
            ConfigError::Io(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(e: serde_yaml::Error) -> Self {
        ConfigError::Yaml(e)
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e)
    }
}

impl ReporterConfig {
    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: ReporterConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a YAML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Check values serde cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.influxdb.url.trim().is_empty() {
            return Err(ConfigError::Invalid("influxdb.url must not be empty".into()));
        }
        if self.reporter.database.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "reporter.database must not be empty".into(),
            ));
        }
        if !(1..=MAX_INTERVAL_SECS).contains(&self.reporter.interval_secs) {
            return Err(ConfigError::Invalid(format!(
                "reporter.interval_secs must be between 1 and {}",
                MAX_INTERVAL_SECS
            )));
        }
        for timeout in [
            self.influxdb.connect_timeout_ms,
            self.influxdb.request_timeout_ms,
        ] {
            if !(1..=MAX_TIMEOUT_MS).contains(&timeout) {
                return Err(ConfigError::Invalid(format!(
                    "influxdb timeouts must be between 1 and {} ms",
                    MAX_TIMEOUT_MS
                )));
            }
        }
        // An empty tag key or value makes every line unparsable
        for (key, value) in &self.reporter.tags {
            if key.is_empty() || value.is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "reporter.tags entry '{}: {}' must have a non-empty key and value",
                    key, value
                )));
            }
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.reporter.interval_secs)
    }

    /// Reporter options described by this configuration.
    pub fn reporter_options(&self) -> ReporterOptions {
        let r = &self.reporter;
        let mut options = ReporterOptions::new(r.database.clone())
            .with_retention_policy(r.retention_policy.clone())
            .with_rate_unit(r.rate_unit)
            .with_duration_unit(r.duration_unit)
            .with_filter(r.filter.clone());
        options.tags = r.tags.clone();
        options
    }

    /// HTTP writer settings described by this configuration.
    pub fn writer_config(&self) -> HttpWriterConfig {
        let i = &self.influxdb;
        HttpWriterConfig {
            url: i.url.clone(),
            username: i.username.clone(),
            password: i.password.clone(),
            connect_timeout: Duration::from_millis(i.connect_timeout_ms),
            request_timeout: Duration::from_millis(i.request_timeout_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL_YAML: &str = r#"
reporter:
  database: "metrics"
"#;

    const FULL_YAML: &str = r#"
influxdb:
  url: "http://influx.example.com:8086"
  username: "telegraf"
  password: "test-password-placeholder"
  connect_timeout_ms: 1000
  request_timeout_ms: 3000
reporter:
  database: "telemetry"
  retention_policy: "one_week"
  interval_secs: 30
  rate_unit: minutes
  duration_unit: microseconds
  report_on_stop: true
  tags:
    service: "monolith"
    host: "server01"
  filter:
    include: ["http.*"]
    exclude: ["*.debug"]
"#;

    #[test]
    fn test_config_parse_minimal() {
        let config = ReporterConfig::from_yaml(MINIMAL_YAML).expect("parse minimal yaml");

        assert_eq!(config.influxdb.url, "http://localhost:8086");
        assert!(config.influxdb.username.is_none());
        assert_eq!(config.influxdb.connect_timeout_ms, 5000);
        assert_eq!(config.influxdb.request_timeout_ms, 5000);

        assert_eq!(config.reporter.database, "metrics");
        assert_eq!(config.reporter.retention_policy, "default");
        assert_eq!(config.interval(), Duration::from_secs(10));
        assert_eq!(config.reporter.rate_unit, TimeUnit::Seconds);
        assert_eq!(config.reporter.duration_unit, TimeUnit::Milliseconds);
        assert!(!config.reporter.report_on_stop);
        assert!(config.reporter.tags.is_empty());
        assert_eq!(config.reporter.filter, NameFilter::default());
    }

    #[test]
    fn test_config_parse_all_fields() {
        let config = ReporterConfig::from_yaml(FULL_YAML).expect("parse full yaml");

        assert_eq!(config.influxdb.url, "http://influx.example.com:8086");
        assert_eq!(config.influxdb.username.as_deref(), Some("telegraf"));
        assert_eq!(
            config.influxdb.password.as_deref(),
            Some("test-password-placeholder")
        );

        let r = &config.reporter;
        assert_eq!(r.database, "telemetry");
        assert_eq!(r.retention_policy, "one_week");
        assert_eq!(r.interval_secs, 30);
        assert_eq!(r.rate_unit, TimeUnit::Minutes);
        assert_eq!(r.duration_unit, TimeUnit::Microseconds);
        assert!(r.report_on_stop);
        assert_eq!(
            r.tags.keys().collect::<Vec<_>>(),
            vec!["host", "service"]
        );
        assert_eq!(r.filter.include, vec!["http.*"]);
        assert_eq!(r.filter.exclude, vec!["*.debug"]);
    }

    #[test]
    fn test_conversions() {
        let config = ReporterConfig::from_yaml(FULL_YAML).expect("parse full yaml");

        let options = config.reporter_options();
        assert_eq!(options.database, "telemetry");
        assert_eq!(options.retention_policy, "one_week");
        assert_eq!(options.rate_unit, TimeUnit::Minutes);
        assert_eq!(options.tags.get("host").map(String::as_str), Some("server01"));

        let writer = config.writer_config();
        assert_eq!(writer.url, "http://influx.example.com:8086");
        assert_eq!(writer.connect_timeout, Duration::from_secs(1));
        assert_eq!(writer.request_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_reporting_config_new_matches_yaml_defaults() {
        let parsed = ReporterConfig::from_yaml(MINIMAL_YAML).expect("parse minimal yaml");
        let built = ReportingConfig::new("metrics");

        assert_eq!(built.database, parsed.reporter.database);
        assert_eq!(built.retention_policy, parsed.reporter.retention_policy);
        assert_eq!(built.interval_secs, parsed.reporter.interval_secs);
        assert_eq!(built.rate_unit, parsed.reporter.rate_unit);
        assert_eq!(built.duration_unit, parsed.reporter.duration_unit);
    }

    #[test]
    fn test_missing_database_is_yaml_error() {
        let err = ReporterConfig::from_yaml("reporter: {}").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_unknown_unit_is_yaml_error() {
        let yaml = "reporter:\n  database: m\n  rate_unit: fortnights\n";
        assert!(matches!(
            ReporterConfig::from_yaml(yaml),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn test_validation() {
        for yaml in [
            "reporter:\n  database: \"\"\n",
            "reporter:\n  database: m\n  interval_secs: 0\n",
            "influxdb:\n  url: \"\"\nreporter:\n  database: m\n",
            "influxdb:\n  request_timeout_ms: 0\nreporter:\n  database: m\n",
            "influxdb:\n  connect_timeout_ms: 3600001\nreporter:\n  database: m\n",
            "reporter:\n  database: m\n  interval_secs: 86401\n",
            "reporter:\n  database: m\n  interval_secs: 18446744073709551615\n",
            "reporter:\n  database: m\n  tags:\n    host: \"\"\n",
            "reporter:\n  database: m\n  tags:\n    \"\": server01\n",
        ] {
            let err = ReporterConfig::from_yaml(yaml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{}", yaml);
        }
    }

    #[test]
    fn test_validation_bounds_are_inclusive() {
        let yaml = "influxdb:\n  request_timeout_ms: 3600000\n\
                    reporter:\n  database: m\n  interval_secs: 86400\n";
        let config = ReporterConfig::from_yaml(yaml).expect("longest values accepted");
        assert_eq!(config.interval(), Duration::from_secs(MAX_INTERVAL_SECS));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(FULL_YAML.as_bytes()).expect("write");

        let config = ReporterConfig::from_file(file.path()).expect("load");
        assert_eq!(config.reporter.database, "telemetry");

        let err = ReporterConfig::from_file(Path::new("/nonexistent/reporter.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
        assert!(err.to_string().starts_with("I/O error"));
    }
}
