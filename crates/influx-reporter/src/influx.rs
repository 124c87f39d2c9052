// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! InfluxDB Line Protocol encoder.
//!
//! Line Protocol format:
//! ```text
//! measurement,tag1=val1,tag2=val2 field1=val1,field2=val2 timestamp_ms
//! ```
//!
//! Encoding is lossy-safe: a point that cannot be represented (no fields,
//! or a non-finite float) produces no output at all rather than an error.
//!
//! See: <https://docs.influxdata.com/influxdb/v1/write_protocols/line_protocol_reference/>

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

/// Tag set attached to a point. Keys iterate in ascending order, which keeps
/// the encoded output canonical regardless of insertion order.
pub type TagSet = BTreeMap<String, String>;

/// A value that can be stored in an InfluxDB field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// 64-bit floating point.
    Float(f64),
    /// 64-bit signed integer.
    Integer(i64),
    /// UTF-8 string.
    String(String),
    /// Boolean value.
    Boolean(bool),
}

impl FieldValue {
    /// Format this value for InfluxDB Line Protocol.
    ///
    /// - Float: shortest round-trip decimal (e.g., `3.14`)
    /// - Integer: suffixed with `i` (e.g., `42i`)
    /// - String: quoted with double quotes, inner quotes escaped (e.g., `"hello"`)
    /// - Boolean: `true` or `false`
    pub fn to_line_protocol(&self) -> String {
        let mut out = String::new();
        self.append_to(&mut out);
        out
    }

    /// Whether this value may appear on the wire. Only NaN and infinities
    /// are rejected.
    pub fn is_encodable(&self) -> bool {
        match self {
            FieldValue::Float(v) => v.is_finite(),
            _ => true,
        }
    }

    fn append_to(&self, buf: &mut String) {
        // Writing into a String cannot fail.
        match self {
            FieldValue::Float(v) => {
                let _ = write!(buf, "{}", v);
            }
            FieldValue::Integer(v) => {
                let _ = write!(buf, "{}i", v);
            }
            FieldValue::String(v) => append_quoted_string(buf, v),
            FieldValue::Boolean(v) => buf.push_str(if *v { "true" } else { "false" }),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_line_protocol())
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Integer(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Boolean(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

/// Check whether a field set can be encoded.
///
/// A field set is rejected as a whole when it is empty or when any float in
/// it is NaN or infinite.
pub fn is_encodable(fields: &[(&str, FieldValue)]) -> bool {
    !fields.is_empty() && fields.iter().all(|(_, value)| value.is_encodable())
}

/// Encode a single point into a fresh string.
///
/// Returns an empty string when the point is skipped.
pub fn encode(
    measurement: &str,
    fields: &[(&str, FieldValue)],
    tags: &TagSet,
    timestamp_ms: i64,
) -> String {
    let mut buf = String::new();
    encode_into(&mut buf, measurement, fields, tags, timestamp_ms);
    buf
}

/// Append a single point, terminated by `\n`, to `buf`.
///
/// Appends nothing when the field set is empty or holds a non-finite
/// float. Existing contents of `buf` are never touched.
///
/// Returns `true` if a line was appended.
pub fn encode_into(
    buf: &mut String,
    measurement: &str,
    fields: &[(&str, FieldValue)],
    tags: &TagSet,
    timestamp_ms: i64,
) -> bool {
    if fields.is_empty() {
        log::debug!("Skipping measurement '{}': no fields given", measurement);
        return false;
    }
    if !is_encodable(fields) {
        log::debug!(
            "Skipping measurement '{}': invalid field value in {:?}",
            measurement,
            fields
        );
        return false;
    }

    append_escaped_measurement(buf, measurement);

    // Tags are optional
    for (key, value) in tags {
        buf.push(',');
        append_escaped_key(buf, key);
        buf.push('=');
        append_escaped_key(buf, value);
    }

    // Space separator before fields
    buf.push(' ');

    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            buf.push(',');
        }
        append_escaped_key(buf, key);
        buf.push('=');
        value.append_to(buf);
    }

    // Space separator before timestamp
    buf.push(' ');
    let _ = write!(buf, "{}", timestamp_ms);
    buf.push('\n');
    true
}

/// Escape a measurement name. Only commas and spaces are escaped.
fn append_escaped_measurement(buf: &mut String, s: &str) {
    for c in s.chars() {
        if c == ',' || c == ' ' {
            buf.push('\\');
        }
        buf.push(c);
    }
}

/// Escape a tag key, tag value or field key.
/// Commas, equals signs, and spaces must be escaped.
fn append_escaped_key(buf: &mut String, s: &str) {
    for c in s.chars() {
        if c == ',' || c == '=' || c == ' ' {
            buf.push('\\');
        }
        buf.push(c);
    }
}

/// Quote a string field value. Only double quotes are escaped.
fn append_quoted_string(buf: &mut String, s: &str) {
    buf.push('"');
    for c in s.chars() {
        if c == '"' {
            buf.push('\\');
        }
        buf.push(c);
    }
    buf.push('"');
}
