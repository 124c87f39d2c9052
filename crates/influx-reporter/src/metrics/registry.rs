// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Named metric registry.

use super::clock::{Clock, MonotonicClock};
use super::{Counter, Gauge, Histogram, Meter, MetricKind, MetricSet, Timer};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Registry errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The name is taken by a metric of another kind.
    #[error("metric '{name}' is already registered as a {existing}, not a {requested}")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },
    /// A gauge with this name is already registered.
    #[error("gauge '{0}' is already registered")]
    AlreadyExists(String),
}

#[derive(Clone)]
enum Entry {
    Gauge(Arc<dyn Gauge>),
    Counter(Arc<Counter>),
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Timer(Arc<Timer>),
}

impl Entry {
    fn kind(&self) -> MetricKind {
        match self {
            Entry::Gauge(_) => MetricKind::Gauge,
            Entry::Counter(_) => MetricKind::Counter,
            Entry::Histogram(_) => MetricKind::Histogram,
            Entry::Meter(_) => MetricKind::Meter,
            Entry::Timer(_) => MetricKind::Timer,
        }
    }
}

/// Thread-safe set of named metrics.
///
/// Metric names are unique across kinds. Accessors are get-or-create, so
/// every part of an application asking for `"requests"` shares one counter.
pub struct MetricRegistry {
    clock: Arc<dyn Clock>,
    metrics: RwLock<BTreeMap<String, Entry>>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(MonotonicClock::new()))
    }

    /// Create a registry whose meters and timers use `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            metrics: RwLock::new(BTreeMap::new()),
        }
    }

    /// Get or create the counter called `name`.
    pub fn counter(&self, name: &str) -> Result<Arc<Counter>, RegistryError> {
        self.get_or_insert(
            name,
            MetricKind::Counter,
            |entry| match entry {
                Entry::Counter(c) => Some(c.clone()),
                _ => None,
            },
            || {
                let c = Arc::new(Counter::new());
                (Entry::Counter(c.clone()), c)
            },
        )
    }

    /// Get or create the histogram called `name`.
    pub fn histogram(&self, name: &str) -> Result<Arc<Histogram>, RegistryError> {
        self.get_or_insert(
            name,
            MetricKind::Histogram,
            |entry| match entry {
                Entry::Histogram(h) => Some(h.clone()),
                _ => None,
            },
            || {
                let h = Arc::new(Histogram::new());
                (Entry::Histogram(h.clone()), h)
            },
        )
    }

    /// Get or create the meter called `name`.
    pub fn meter(&self, name: &str) -> Result<Arc<Meter>, RegistryError> {
        let clock = self.clock.clone();
        self.get_or_insert(
            name,
            MetricKind::Meter,
            |entry| match entry {
                Entry::Meter(m) => Some(m.clone()),
                _ => None,
            },
            move || {
                let m = Arc::new(Meter::with_clock(clock));
                (Entry::Meter(m.clone()), m)
            },
        )
    }

    /// Get or create the timer called `name`.
    pub fn timer(&self, name: &str) -> Result<Arc<Timer>, RegistryError> {
        let clock = self.clock.clone();
        self.get_or_insert(
            name,
            MetricKind::Timer,
            |entry| match entry {
                Entry::Timer(t) => Some(t.clone()),
                _ => None,
            },
            move || {
                let t = Arc::new(Timer::with_clock(clock));
                (Entry::Timer(t.clone()), t)
            },
        )
    }

    /// Register a gauge under `name`.
    pub fn register_gauge<G>(&self, name: &str, gauge: G) -> Result<(), RegistryError>
    where
        G: Gauge + 'static,
    {
        let mut metrics = self.metrics.write();
        if let Some(existing) = metrics.get(name) {
            return Err(match existing.kind() {
                MetricKind::Gauge => RegistryError::AlreadyExists(name.to_string()),
                other => RegistryError::KindMismatch {
                    name: name.to_string(),
                    existing: other,
                    requested: MetricKind::Gauge,
                },
            });
        }
        metrics.insert(name.to_string(), Entry::Gauge(Arc::new(gauge)));
        Ok(())
    }

    /// Remove the metric called `name`. Returns whether one was removed.
    pub fn remove(&self, name: &str) -> bool {
        self.metrics.write().remove(name).is_some()
    }

    /// Registered names, in ascending order.
    pub fn names(&self) -> Vec<String> {
        self.metrics.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.metrics.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.read().is_empty()
    }

    /// All registered metrics, grouped by kind.
    ///
    /// The handles are shared with the registry; reading them later
    /// observes live values.
    pub fn snapshot(&self) -> MetricSet {
        let metrics = self.metrics.read();
        let mut set = MetricSet::new();
        for (name, entry) in metrics.iter() {
            match entry {
                Entry::Gauge(g) => {
                    set.gauges.insert(name.clone(), g.clone());
                }
                Entry::Counter(c) => {
                    set.counters.insert(name.clone(), c.clone());
                }
                Entry::Histogram(h) => {
                    set.histograms.insert(name.clone(), h.clone());
                }
                Entry::Meter(m) => {
                    set.meters.insert(name.clone(), m.clone());
                }
                Entry::Timer(t) => {
                    set.timers.insert(name.clone(), t.clone());
                }
            }
        }
        set
    }

    fn get_or_insert<T>(
        &self,
        name: &str,
        requested: MetricKind,
        extract: impl Fn(&Entry) -> Option<Arc<T>>,
        create: impl FnOnce() -> (Entry, Arc<T>),
    ) -> Result<Arc<T>, RegistryError> {
        let mismatch = |existing: &Entry| RegistryError::KindMismatch {
            name: name.to_string(),
            existing: existing.kind(),
            requested,
        };

        if let Some(entry) = self.metrics.read().get(name) {
            return extract(entry).ok_or_else(|| mismatch(entry));
        }

        let mut metrics = self.metrics.write();
        // Another thread may have registered it between the two locks
        if let Some(entry) = metrics.get(name) {
            return extract(entry).ok_or_else(|| mismatch(entry));
        }
        let (entry, handle) = create();
        metrics.insert(name.to_string(), entry);
        Ok(handle)
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MetricRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricRegistry")
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_shares_instances() {
        let registry = MetricRegistry::new();
        let a = registry.counter("requests").expect("counter");
        let b = registry.counter("requests").expect("counter");
        a.inc();
        assert_eq!(b.count(), 1);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_kind_mismatch() {
        let registry = MetricRegistry::new();
        registry.counter("x").expect("counter");

        let err = registry.timer("x").unwrap_err();
        assert_eq!(
            err,
            RegistryError::KindMismatch {
                name: "x".to_string(),
                existing: MetricKind::Counter,
                requested: MetricKind::Timer,
            }
        );
        assert_eq!(
            err.to_string(),
            "metric 'x' is already registered as a counter, not a timer"
        );

        let err = registry.register_gauge("x", || 1).unwrap_err();
        assert!(matches!(err, RegistryError::KindMismatch { .. }));
    }

    #[test]
    fn test_duplicate_gauge() {
        let registry = MetricRegistry::new();
        registry.register_gauge("g", || 1).expect("first gauge");
        assert_eq!(
            registry.register_gauge("g", || 2),
            Err(RegistryError::AlreadyExists("g".to_string()))
        );
    }

    #[test]
    fn test_snapshot_groups_and_sorts() {
        let registry = MetricRegistry::new();
        registry.counter("b.count").expect("counter");
        registry.counter("a.count").expect("counter");
        registry.histogram("sizes").expect("histogram");
        registry.meter("events").expect("meter");
        registry.timer("latency").expect("timer");
        registry.register_gauge("depth", || 3).expect("gauge");

        let set = registry.snapshot();
        assert_eq!(set.len(), 6);
        assert_eq!(
            set.counters.keys().collect::<Vec<_>>(),
            vec!["a.count", "b.count"]
        );
        assert!(set.histograms.contains_key("sizes"));
        assert!(set.meters.contains_key("events"));
        assert!(set.timers.contains_key("latency"));
        assert!(set.gauges.contains_key("depth"));
    }

    #[test]
    fn test_remove_and_names() {
        let registry = MetricRegistry::new();
        registry.meter("m").expect("meter");
        registry.counter("c").expect("counter");
        assert_eq!(registry.names(), vec!["c", "m"]);

        assert!(registry.remove("m"));
        assert!(!registry.remove("m"));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }
}
