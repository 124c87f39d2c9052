// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use serde_json::Value;

/// An instantaneous reading of some value.
///
/// Readings are dynamically typed. Only numbers, strings and booleans can be
/// reported; any other reading (null, arrays, objects) causes the gauge to be
/// skipped for that tick.
pub trait Gauge: Send + Sync {
    fn value(&self) -> Value;
}

impl<F, T> Gauge for F
where
    F: Fn() -> T + Send + Sync,
    T: Into<Value>,
{
    fn value(&self) -> Value {
        self().into()
    }
}
