// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metric snapshot mapping to InfluxDB field sets.
//!
//! Dynamically typed readings (gauges) are converted to [`FieldValue`] here,
//! so the encoder only ever sees the four representable types.

use crate::influx::FieldValue;
use crate::metrics::{Counter, MeterSnapshot, Snapshot, TimeUnit};
use serde_json::Value;

/// Field set derived from one metric, in derivation order.
pub type FieldSet = Vec<(&'static str, FieldValue)>;

/// A reading that has no Line Protocol representation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unsupported field value: {0}")]
pub struct UnsupportedValue(pub Value);

impl FieldValue {
    /// Convert a JSON value to a FieldValue with type inference.
    ///
    /// Integral numbers that fit in `i64` become [`FieldValue::Integer`],
    /// every other number a [`FieldValue::Float`]. Null, arrays and objects
    /// are rejected.
    pub fn from_json(val: &Value) -> Result<FieldValue, UnsupportedValue> {
        match val {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(FieldValue::Integer(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(FieldValue::Float(f))
                } else {
                    Err(UnsupportedValue(val.clone()))
                }
            }
            Value::String(s) => Ok(FieldValue::String(s.clone())),
            Value::Bool(b) => Ok(FieldValue::Boolean(*b)),
            // Null, arrays and objects are not valid field values
            _ => Err(UnsupportedValue(val.clone())),
        }
    }
}

/// Derives the per-kind field sets reported for each metric.
///
/// Rates are converted from events per second to events per `rate_unit`;
/// timer durations from nanoseconds to `duration_unit`.
#[derive(Debug, Clone, Copy)]
pub struct FieldMapper {
    rate_unit: TimeUnit,
    duration_unit: TimeUnit,
}

impl FieldMapper {
    pub fn new(rate_unit: TimeUnit, duration_unit: TimeUnit) -> Self {
        Self {
            rate_unit,
            duration_unit,
        }
    }

    pub fn rate_unit(&self) -> TimeUnit {
        self.rate_unit
    }

    pub fn duration_unit(&self) -> TimeUnit {
        self.duration_unit
    }

    /// `value`, the gauge reading.
    pub fn gauge_fields(&self, reading: &Value) -> Result<FieldSet, UnsupportedValue> {
        Ok(vec![("value", FieldValue::from_json(reading)?)])
    }

    /// `count`.
    pub fn counter_fields(&self, counter: &Counter) -> FieldSet {
        vec![("count", FieldValue::Integer(counter.count()))]
    }

    /// `count`, then the distribution in raw sample units.
    pub fn histogram_fields(&self, count: u64, snapshot: &Snapshot) -> FieldSet {
        let mut fields = Vec::with_capacity(11);
        fields.push(("count", integer(count)));
        fields.push(("min", FieldValue::Integer(snapshot.min())));
        fields.push(("max", FieldValue::Integer(snapshot.max())));
        fields.push(("mean", FieldValue::Float(snapshot.mean())));
        fields.push(("median", FieldValue::Float(snapshot.median())));
        fields.push(("std-dev", FieldValue::Float(snapshot.std_dev())));
        fields.push(("75-percentile", FieldValue::Float(snapshot.p75())));
        fields.push(("95-percentile", FieldValue::Float(snapshot.p95())));
        fields.push(("98-percentile", FieldValue::Float(snapshot.p98())));
        fields.push(("99-percentile", FieldValue::Float(snapshot.p99())));
        fields.push(("999-percentile", FieldValue::Float(snapshot.p999())));
        fields
    }

    /// `count`, then the mean and moving-average rates.
    pub fn meter_fields(&self, meter: &MeterSnapshot) -> FieldSet {
        let mut fields = Vec::with_capacity(5);
        self.push_rates(&mut fields, meter);
        fields
    }

    /// Meter fields followed by the duration distribution.
    pub fn timer_fields(&self, rates: &MeterSnapshot, durations: &Snapshot) -> FieldSet {
        let mut fields = Vec::with_capacity(15);
        self.push_rates(&mut fields, rates);

        let d = |nanos: f64| FieldValue::Float(self.duration_unit.convert_duration(nanos));
        fields.push(("min", d(durations.min() as f64)));
        fields.push(("max", d(durations.max() as f64)));
        fields.push(("mean", d(durations.mean())));
        fields.push(("median", d(durations.median())));
        fields.push(("std-dev", d(durations.std_dev())));
        fields.push(("75-percentile", d(durations.p75())));
        fields.push(("95-percentile", d(durations.p95())));
        fields.push(("98-percentile", d(durations.p98())));
        fields.push(("99-percentile", d(durations.p99())));
        fields.push(("999-percentile", d(durations.p999())));
        fields
    }

    fn push_rates(&self, fields: &mut FieldSet, meter: &MeterSnapshot) {
        let r = |per_second: f64| FieldValue::Float(self.rate_unit.convert_rate(per_second));
        fields.push(("count", integer(meter.count)));
        fields.push(("mean-rate", r(meter.mean_rate)));
        fields.push(("1-min-rate", r(meter.one_minute_rate)));
        fields.push(("5-min-rate", r(meter.five_minute_rate)));
        fields.push(("15-min-rate", r(meter.fifteen_minute_rate)));
    }
}

impl Default for FieldMapper {
    fn default() -> Self {
        Self::new(TimeUnit::Seconds, TimeUnit::Milliseconds)
    }
}

fn integer(count: u64) -> FieldValue {
    FieldValue::Integer(i64::try_from(count).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn field<'a>(fields: &'a FieldSet, name: &str) -> &'a FieldValue {
        &fields
            .iter()
            .find(|(k, _)| *k == name)
            .unwrap_or_else(|| panic!("missing field {}", name))
            .1
    }

    fn float(fields: &FieldSet, name: &str) -> f64 {
        match field(fields, name) {
            FieldValue::Float(v) => *v,
            other => panic!("expected Float for {}, got {:?}", name, other),
        }
    }

    #[test]
    fn test_from_json_all_types() {
        assert_eq!(FieldValue::from_json(&json!(1.5)), Ok(FieldValue::Float(1.5)));
        assert_eq!(FieldValue::from_json(&json!(42)), Ok(FieldValue::Integer(42)));
        assert_eq!(
            FieldValue::from_json(&json!("hello")),
            Ok(FieldValue::String("hello".to_string()))
        );
        assert_eq!(FieldValue::from_json(&json!(true)), Ok(FieldValue::Boolean(true)));
    }

    #[test]
    fn test_from_json_large_unsigned_becomes_float() {
        let v = FieldValue::from_json(&json!(u64::MAX)).expect("number");
        assert_eq!(v, FieldValue::Float(u64::MAX as f64));
    }

    #[test]
    fn test_from_json_null_and_objects_rejected() {
        for v in [json!(null), json!([1, 2, 3]), json!({"nested": true})] {
            let err = FieldValue::from_json(&v).unwrap_err();
            assert_eq!(err, UnsupportedValue(v.clone()));
        }
    }

    #[test]
    fn test_gauge_fields() {
        let mapper = FieldMapper::default();
        let fields = mapper.gauge_fields(&json!(0.75)).expect("gauge");
        assert_eq!(fields, vec![("value", FieldValue::Float(0.75))]);
        assert!(mapper.gauge_fields(&Value::Null).is_err());
    }

    #[test]
    fn test_counter_fields() {
        let counter = Counter::new();
        counter.inc_by(3);
        let fields = FieldMapper::default().counter_fields(&counter);
        assert_eq!(fields, vec![("count", FieldValue::Integer(3))]);
    }

    #[test]
    fn test_histogram_fields() {
        let snapshot = Snapshot::new(vec![1, 2, 3, 4, 5]);
        let fields = FieldMapper::default().histogram_fields(5, &snapshot);

        let names: Vec<&str> = fields.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            names,
            vec![
                "count",
                "min",
                "max",
                "mean",
                "median",
                "std-dev",
                "75-percentile",
                "95-percentile",
                "98-percentile",
                "99-percentile",
                "999-percentile",
            ]
        );
        assert_eq!(field(&fields, "count"), &FieldValue::Integer(5));
        assert_eq!(field(&fields, "min"), &FieldValue::Integer(1));
        assert_eq!(field(&fields, "max"), &FieldValue::Integer(5));
        assert_eq!(float(&fields, "median"), 3.0);
        assert_eq!(float(&fields, "75-percentile"), 4.5);
    }

    #[test]
    fn test_meter_fields_convert_rate_unit() {
        let snapshot = MeterSnapshot {
            count: 120,
            mean_rate: 2.0,
            one_minute_rate: 1.0,
            five_minute_rate: 0.5,
            fifteen_minute_rate: 0.25,
        };
        let mapper = FieldMapper::new(TimeUnit::Minutes, TimeUnit::Milliseconds);
        let fields = mapper.meter_fields(&snapshot);

        assert_eq!(fields.len(), 5);
        assert_eq!(field(&fields, "count"), &FieldValue::Integer(120));
        assert_eq!(float(&fields, "mean-rate"), 120.0);
        assert_eq!(float(&fields, "1-min-rate"), 60.0);
        assert_eq!(float(&fields, "5-min-rate"), 30.0);
        assert_eq!(float(&fields, "15-min-rate"), 15.0);
    }

    #[test]
    fn test_timer_fields_convert_duration_unit() {
        let rates = MeterSnapshot {
            count: 3,
            mean_rate: 1.0,
            one_minute_rate: 0.0,
            five_minute_rate: 0.0,
            fifteen_minute_rate: 0.0,
        };
        // 1 ms, 2 ms, 3 ms in nanoseconds
        let durations = Snapshot::new(vec![1_000_000, 2_000_000, 3_000_000]);
        let fields = FieldMapper::default().timer_fields(&rates, &durations);

        assert_eq!(fields.len(), 15);
        assert_eq!(field(&fields, "count"), &FieldValue::Integer(3));
        assert_eq!(float(&fields, "min"), 1.0);
        assert_eq!(float(&fields, "max"), 3.0);
        assert_eq!(float(&fields, "mean"), 2.0);
        assert_eq!(float(&fields, "median"), 2.0);
        assert_eq!(float(&fields, "std-dev"), 1.0);
        assert_eq!(float(&fields, "mean-rate"), 1.0);
    }

    #[test]
    fn test_count_saturates() {
        let fields = FieldMapper::default().histogram_fields(u64::MAX, &Snapshot::default());
        assert_eq!(field(&fields, "count"), &FieldValue::Integer(i64::MAX));
    }
}
