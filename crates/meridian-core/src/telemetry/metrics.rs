// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Identity, value and error types for aggregated metric updates.

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::time::SystemTime;

/// A set of key-value labels attached to a measurement.
///
/// Labels are kept sorted by key so that two sets built from the same pairs in
/// a different order hash and compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct LabelSet {
    labels: Vec<(String, String)>,
}

impl LabelSet {
    /// Creates a label set from any iterator of key-value pairs.
    pub fn new<K, V, I>(labels: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut labels: Vec<(String, String)> = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        labels.sort_by(|a, b| a.0.cmp(&b.0));
        Self { labels }
    }

    /// The blank label set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Adds a label, returning a new `LabelSet`.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push((key.into(), value.into()));
        self.labels.sort_by(|a, b| a.0.cmp(&b.0));
        self
    }

    /// Looks up the value of a label by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Iterates the labels in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of labels in the set.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` for the blank label set.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A unique, structured identifier for one exported time series.
///
/// A `MetricId` is composed of the owning meter's name, the instrument name and
/// the label set the value was recorded under.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MetricId {
    /// Name of the meter that owns the instrument. Empty for the default meter.
    pub meter: String,
    /// The instrument name (e.g., "server.core.totalTime").
    pub name: String,
    /// Dimensional labels for filtering.
    pub labels: LabelSet,
}

impl MetricId {
    /// Creates a new `MetricId` with a meter name and an instrument name.
    pub fn new(meter: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            meter: meter.into(),
            name: name.into(),
            labels: LabelSet::empty(),
        }
    }

    /// Adds a dimensional label to the metric ID, returning a new `MetricId`.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels = self.labels.with_label(key, value);
        self
    }

    /// Replaces the whole label set.
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = labels;
        self
    }

    /// Returns a formatted string representation of the ID (e.g., "meter:name[k=v,...]").
    pub fn to_string_formatted(&self) -> String {
        if self.labels.is_empty() {
            format!("{}:{}", self.meter, self.name)
        } else {
            let labels_str = self
                .labels
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(",");
            format!("{}:{}[{}]", self.meter, self.name, labels_str)
        }
    }
}

impl Display for MetricId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_string_formatted())
    }
}

/// The fundamental type of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    /// A value that only ever increases (e.g., total requests).
    Counter,
    /// A value that can go up or down; the last recorded value wins.
    Gauge,
}

/// An aggregated value as it travels through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    /// A 64-bit unsigned integer for counters.
    Counter(u64),
    /// A 64-bit float for gauges.
    Gauge(f64),
}

impl MetricValue {
    /// Returns the [`MetricType`] corresponding to this value.
    pub fn metric_type(&self) -> MetricType {
        match self {
            MetricValue::Counter(_) => MetricType::Counter,
            MetricValue::Gauge(_) => MetricType::Gauge,
        }
    }

    /// Returns the value widened to an `f64`.
    pub fn as_f64(&self) -> f64 {
        match self {
            MetricValue::Counter(v) => *v as f64,
            MetricValue::Gauge(v) => *v,
        }
    }

    /// Returns the value as a `u64` if it is a `Counter`.
    pub fn as_counter(&self) -> Option<u64> {
        match self {
            MetricValue::Counter(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an `f64` if it is a `Gauge`.
    pub fn as_gauge(&self) -> Option<f64> {
        match self {
            MetricValue::Gauge(v) => Some(*v),
            _ => None,
        }
    }
}

/// One aggregated update pushed through the processor chain during a
/// collection cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricRecord {
    /// Which series this update belongs to.
    pub id: MetricId,
    /// The checkpointed value.
    pub value: MetricValue,
    /// Wall-clock time the checkpoint was taken.
    pub timestamp: SystemTime,
}

impl MetricRecord {
    /// Creates a record stamped with the current time.
    pub fn new(id: MetricId, value: MetricValue) -> Self {
        Self {
            id,
            value,
            timestamp: SystemTime::now(),
        }
    }
}

/// A specialized `Result` type for metric-related operations.
pub type MetricsResult<T> = Result<T, MetricsError>;

/// An error that can occur on the metrics runtime path.
#[derive(Debug, Clone)]
pub enum MetricsError {
    /// An instrument name was reused with a different kind.
    TypeMismatch {
        /// The expected metric type for the operation.
        expected: MetricType,
        /// The actual metric type that was found.
        found: MetricType,
    },
    /// A processing stage failed while handling an update.
    Processor(String),
    /// An invalid operation was attempted.
    InvalidOperation(String),
}

impl Display for MetricsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricsError::TypeMismatch { expected, found } => {
                write!(f, "Type mismatch: expected {expected:?}, found {found:?}")
            }
            MetricsError::Processor(msg) => write!(f, "Processor error: {msg}"),
            MetricsError::InvalidOperation(msg) => write!(f, "Invalid operation: {msg}"),
        }
    }
}

impl std::error::Error for MetricsError {}
