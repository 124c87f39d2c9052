// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Payload buffer for Line Protocol lines.
//!
//! One buffer holds the lines of a single reporting tick. Its initial
//! capacity comes from a [`CapacityHint`] that remembers the largest payload
//! produced so far, so steady-state ticks do not reallocate.

use crate::influx::{self, FieldValue, TagSet};

/// Initial capacity of a payload buffer, in bytes.
pub const INITIAL_CAPACITY: usize = 500;

/// Largest payload size seen so far. Never shrinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapacityHint(usize);

impl CapacityHint {
    pub fn new() -> Self {
        Self(INITIAL_CAPACITY)
    }

    pub fn get(&self) -> usize {
        self.0
    }

    /// Record the size of a finished payload.
    pub fn observe(&mut self, len: usize) {
        self.0 = self.0.max(len);
    }
}

impl Default for CapacityHint {
    fn default() -> Self {
        Self::new()
    }
}

/// Accumulates the Line Protocol lines of one tick.
#[derive(Debug)]
pub struct PayloadBuffer {
    payload: String,
    lines: usize,
}

impl PayloadBuffer {
    /// Create a buffer pre-sized from `hint`.
    pub fn new(hint: CapacityHint) -> Self {
        Self {
            payload: String::with_capacity(hint.get()),
            lines: 0,
        }
    }

    /// Encode and append one point.
    ///
    /// Returns `false` and leaves the buffer untouched when the point
    /// cannot be encoded.
    pub fn push_point(
        &mut self,
        measurement: &str,
        fields: &[(&str, FieldValue)],
        tags: &TagSet,
        timestamp_ms: i64,
    ) -> bool {
        let written = influx::encode_into(&mut self.payload, measurement, fields, tags, timestamp_ms);
        if written {
            self.lines += 1;
        }
        written
    }

    /// Number of lines appended.
    pub fn lines(&self) -> usize {
        self.lines
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.payload
    }

    pub fn into_string(self) -> String {
        self.payload
    }
}
