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

//! Gauges and counters.

use meridian_core::telemetry::{LabelSet, MetricId, MetricRecord, MetricType, MetricValue};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug)]
struct Series {
    value: MetricValue,
    dirty: bool,
}

/// Values of one instrument, one series per label set.
#[derive(Debug)]
pub(crate) struct InstrumentCore {
    meter: String,
    name: String,
    kind: MetricType,
    series: Mutex<HashMap<LabelSet, Series>>,
}

impl InstrumentCore {
    pub(crate) fn new(meter: &str, name: &str, kind: MetricType) -> Arc<Self> {
        Arc::new(Self {
            meter: meter.to_string(),
            name: name.to_string(),
            kind,
            series: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn kind(&self) -> MetricType {
        self.kind
    }

    fn update(&self, labels: &LabelSet, apply: impl FnOnce(Option<MetricValue>) -> MetricValue) {
        let mut series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        match series.get_mut(labels) {
            Some(entry) => {
                entry.value = apply(Some(entry.value));
                entry.dirty = true;
            }
            None => {
                series.insert(
                    labels.clone(),
                    Series {
                        value: apply(None),
                        dirty: true,
                    },
                );
            }
        }
    }

    fn current(&self, labels: &LabelSet) -> Option<MetricValue> {
        self.series
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(labels)
            .map(|entry| entry.value)
    }

    /// Takes a record for every series updated since the previous
    /// checkpoint.
    pub(crate) fn checkpoint(&self) -> Vec<MetricRecord> {
        let mut series = self.series.lock().unwrap_or_else(PoisonError::into_inner);
        series
            .iter_mut()
            .filter(|(_, entry)| entry.dirty)
            .map(|(labels, entry)| {
                entry.dirty = false;
                MetricRecord::new(
                    MetricId::new(self.meter.as_str(), self.name.as_str())
                        .with_labels(labels.clone()),
                    entry.value,
                )
            })
            .collect()
    }
}

/// Records the last value set for each label set.
#[derive(Debug, Clone)]
pub struct Gauge {
    core: Arc<InstrumentCore>,
}

impl Gauge {
    pub(crate) fn new(core: Arc<InstrumentCore>) -> Self {
        Self { core }
    }

    /// Set the gauge to a specific value
    pub fn set(&self, value: f64, labels: &LabelSet) {
        self.core.update(labels, |_| MetricValue::Gauge(value));
    }

    /// The current value for `labels`, if any was set
    pub fn get(&self, labels: &LabelSet) -> Option<f64> {
        self.core.current(labels).and_then(|v| v.as_gauge())
    }

    /// The instrument name
    pub fn name(&self) -> &str {
        &self.core.name
    }
}

/// Monotonic sum per label set.
#[derive(Debug, Clone)]
pub struct Counter {
    core: Arc<InstrumentCore>,
}

impl Counter {
    pub(crate) fn new(core: Arc<InstrumentCore>) -> Self {
        Self { core }
    }

    /// Increment the counter by a specific amount
    pub fn add(&self, delta: u64, labels: &LabelSet) {
        self.core.update(labels, |current| {
            let total = current.and_then(|v| v.as_counter()).unwrap_or(0);
            MetricValue::Counter(total.saturating_add(delta))
        });
    }

    /// Increment the counter by 1
    pub fn increment(&self, labels: &LabelSet) {
        self.add(1, labels);
    }

    /// The running total for `labels`, if anything was added
    pub fn get(&self, labels: &LabelSet) -> Option<u64> {
        self.core.current(labels).and_then(|v| v.as_counter())
    }

    /// The instrument name
    pub fn name(&self) -> &str {
        &self.core.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gauge_keeps_last_value_per_label_set() {
        let gauge = Gauge::new(InstrumentCore::new("m", "temp", MetricType::Gauge));
        let a = LabelSet::new([("room", "a")]);
        let b = LabelSet::new([("room", "b")]);

        gauge.set(1.0, &a);
        gauge.set(2.0, &a);
        gauge.set(5.0, &b);

        assert_eq!(gauge.get(&a), Some(2.0));
        assert_eq!(gauge.get(&b), Some(5.0));
        assert_eq!(gauge.get(&LabelSet::empty()), None);
    }

    #[test]
    fn test_counter_sums_and_saturates() {
        let counter = Counter::new(InstrumentCore::new("m", "hits", MetricType::Counter));
        let labels = LabelSet::empty();

        counter.add(3, &labels);
        counter.increment(&labels);
        assert_eq!(counter.get(&labels), Some(4));

        counter.add(u64::MAX, &labels);
        assert_eq!(counter.get(&labels), Some(u64::MAX));
    }

    #[test]
    fn test_checkpoint_emits_only_updated_series() {
        let core = InstrumentCore::new("m", "temp", MetricType::Gauge);
        let gauge = Gauge::new(core.clone());
        let a = LabelSet::new([("room", "a")]);
        let b = LabelSet::new([("room", "b")]);

        gauge.set(1.0, &a);
        gauge.set(2.0, &b);
        assert_eq!(core.checkpoint().len(), 2);
        assert!(core.checkpoint().is_empty());

        gauge.set(3.0, &a);
        let records = core.checkpoint();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, MetricId::new("m", "temp").with_labels(a));
        assert_eq!(records[0].value, MetricValue::Gauge(3.0));
    }
}
