// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload transport.
//!
//! [`Writer`] is the seam between the reporter and the remote store. The
//! bundled [`HttpWriter`] speaks the InfluxDB 1.x `/write` endpoint.

use reqwest::blocking::Client as BlockingClient;
use reqwest::Url;
use std::sync::Arc;
use std::time::Duration;

/// Content type of a Line Protocol payload.
pub const CONTENT_TYPE: &str = "application/influxdb-line; charset=utf-8";

/// Timestamp precision sent with every write.
pub const PRECISION: &str = "ms";

/// Retention policy name meaning "the database default".
pub const DEFAULT_RETENTION_POLICY: &str = "default";

/// Errors reported by a [`Writer`].
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    /// The store answered with a status other than 200 or 204.
    #[error("InfluxDB responded with HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// The request did not complete.
    #[error("transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// The configured base URL is unusable.
    #[error("invalid InfluxDB url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Delivers one tick's payload to a database.
pub trait Writer: Send + Sync {
    fn write(
        &self,
        payload: &str,
        database: &str,
        retention_policy: Option<&str>,
    ) -> Result<(), WriteError>;
}

impl<W: Writer + ?Sized> Writer for Box<W> {
    fn write(
        &self,
        payload: &str,
        database: &str,
        retention_policy: Option<&str>,
    ) -> Result<(), WriteError> {
        (**self).write(payload, database, retention_policy)
    }
}

impl<W: Writer + ?Sized> Writer for Arc<W> {
    fn write(
        &self,
        payload: &str,
        database: &str,
        retention_policy: Option<&str>,
    ) -> Result<(), WriteError> {
        (**self).write(payload, database, retention_policy)
    }
}

/// Retention policy to send, if any.
///
/// Empty names and the `default` sentinel (any case) mean "omit".
pub fn effective_retention_policy(retention_policy: Option<&str>) -> Option<&str> {
    retention_policy
        .filter(|rp| !rp.is_empty() && !rp.eq_ignore_ascii_case(DEFAULT_RETENTION_POLICY))
}

/// Connection settings for [`HttpWriter`].
#[derive(Debug, Clone)]
pub struct HttpWriterConfig {
    /// Base URL of the InfluxDB server, e.g. `http://localhost:8086`.
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpWriterConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8086".to_string(),
            username: None,
            password: None,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Blocking HTTP writer for the InfluxDB `/write` endpoint.
#[derive(Debug)]
pub struct HttpWriter {
    client: BlockingClient,
    base: Url,
    username: Option<String>,
    password: Option<String>,
}

impl HttpWriter {
    /// Create a writer. Fails when the base URL is not an absolute
    /// `http` or `https` URL.
    pub fn new(config: HttpWriterConfig) -> Result<Self, WriteError> {
        let base = parse_base_url(&config.url)?;
        let client = BlockingClient::builder()
            .no_proxy()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| WriteError::Transport(Box::new(e)))?;

        Ok(Self {
            client,
            base,
            username: config.username,
            password: config.password,
        })
    }

    /// Full write URL for `database` and `retention_policy`.
    pub fn write_url(&self, database: &str, retention_policy: Option<&str>) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut()
            .append_pair("db", database)
            .append_pair("precision", PRECISION);
        if let Some(rp) = effective_retention_policy(retention_policy) {
            url.query_pairs_mut().append_pair("rp", rp);
        }
        url
    }
}

impl Writer for HttpWriter {
    fn write(
        &self,
        payload: &str,
        database: &str,
        retention_policy: Option<&str>,
    ) -> Result<(), WriteError> {
        let url = self.write_url(database, retention_policy);

        let mut request = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .body(payload.to_owned());
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_ref());
        }

        let resp = request
            .send()
            .map_err(|e| WriteError::Transport(Box::new(e)))?;

        let status = resp.status().as_u16();
        if status == 200 || status == 204 {
            return Ok(());
        }
        let body = resp.text().unwrap_or_default();
        Err(WriteError::Status { status, body })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, WriteError> {
    let invalid = |reason: String| WriteError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let base = Url::parse(&format!("{}/write", raw.trim_end_matches('/')))
        .map_err(|e| invalid(e.to_string()))?;
    match base.scheme() {
        "http" | "https" => Ok(base),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer(url: &str) -> HttpWriter {
        HttpWriter::new(HttpWriterConfig {
            url: url.to_string(),
            ..Default::default()
        })
        .expect("valid url")
    }

    #[test]
    fn test_effective_retention_policy() {
        assert_eq!(effective_retention_policy(None), None);
        assert_eq!(effective_retention_policy(Some("")), None);
        assert_eq!(effective_retention_policy(Some("default")), None);
        assert_eq!(effective_retention_policy(Some("DEFAULT")), None);
        assert_eq!(effective_retention_policy(Some("one_week")), Some("one_week"));
    }

    #[test]
    fn test_write_url_omits_default_policy() {
        let w = writer("http://localhost:8086");
        assert_eq!(
            w.write_url("metrics", Some("Default")).as_str(),
            "http://localhost:8086/write?db=metrics&precision=ms"
        );
        assert_eq!(
            w.write_url("metrics", Some("autogen")).as_str(),
            "http://localhost:8086/write?db=metrics&precision=ms&rp=autogen"
        );
    }

    #[test]
    fn test_write_url_trailing_slash_and_encoding() {
        let w = writer("http://influx.example.com:8086/");
        assert_eq!(
            w.write_url("my db", None).as_str(),
            "http://influx.example.com:8086/write?db=my+db&precision=ms"
        );
    }

    #[test]
    fn test_invalid_urls_rejected() {
        for url in ["not a url", "ftp://example.com"] {
            let err = HttpWriter::new(HttpWriterConfig {
                url: url.to_string(),
                ..Default::default()
            })
            .unwrap_err();
            assert!(matches!(err, WriteError::InvalidUrl { .. }), "{}", url);
        }
    }

    #[test]
    fn test_write_error_display() {
        let err = WriteError::Status {
            status: 400,
            body: "partial write".to_string(),
        };
        assert_eq!(err.to_string(), "InfluxDB responded with HTTP 400: partial write");

        let err = WriteError::Transport("connection refused".into());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }
}
