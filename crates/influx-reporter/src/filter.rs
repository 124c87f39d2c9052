// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Metric selection.
//!
//! A filter decides, per metric, whether it takes part in a report. It is
//! consulted before any statistic is computed, so excluded metrics cost
//! nothing beyond the name check.

use crate::metrics::MetricRef;
use serde::Deserialize;

/// Predicate deciding which metrics are reported.
pub trait MetricFilter: Send + Sync {
    fn matches(&self, name: &str, metric: MetricRef<'_>) -> bool;
}

/// Reports every metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAll;

impl MetricFilter for AcceptAll {
    fn matches(&self, _name: &str, _metric: MetricRef<'_>) -> bool {
        true
    }
}

impl<F> MetricFilter for F
where
    F: Fn(&str, MetricRef<'_>) -> bool + Send + Sync,
{
    fn matches(&self, name: &str, metric: MetricRef<'_>) -> bool {
        self(name, metric)
    }
}

/// Glob-based name filter.
///
/// Patterns support `*` (any sequence) and `?` (any single character).
/// An empty include list accepts every name. A name matching any exclude
/// pattern is rejected even when it is also included.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NameFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl NameFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Check a metric name against the include and exclude lists.
    pub fn accepts(&self, name: &str) -> bool {
        if self.exclude.iter().any(|p| glob_match(p, name)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|p| glob_match(p, name))
    }
}

impl MetricFilter for NameFilter {
    fn matches(&self, name: &str, _metric: MetricRef<'_>) -> bool {
        self.accepts(name)
    }
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern_chars: Vec<char> = pattern.chars().collect();
    let text_chars: Vec<char> = text.chars().collect();
    glob_match_recursive(&pattern_chars, &text_chars, 0, 0)
}

fn glob_match_recursive(pattern: &[char], text: &[char], pi: usize, ti: usize) -> bool {
    if pi == pattern.len() {
        return ti == text.len();
    }

    match pattern[pi] {
        '*' => (ti..=text.len()).any(|i| glob_match_recursive(pattern, text, pi + 1, i)),
        '?' => ti < text.len() && glob_match_recursive(pattern, text, pi + 1, ti + 1),
        c => ti < text.len() && text[ti] == c && glob_match_recursive(pattern, text, pi + 1, ti + 1),
    }
}
