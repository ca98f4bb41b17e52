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

use super::{Collector, CollectorFactory};
use crate::metrics::{Counter, Gauge, Meter};
use meridian_core::event::{Activity, EventSourceRegistry, ListenerHandler, SubscriptionManager};
use meridian_core::telemetry::{LabelSet, MetricsResult};
use std::sync::Arc;

/// Gauge holding the duration of the last finished activity, in milliseconds.
pub const DURATION_METRIC: &str = "activity.duration_ms";
/// Counter of finished activities.
pub const COUNT_METRIC: &str = "activity.count";
/// Counter of failed activities.
pub const ERRORS_METRIC: &str = "activity.errors";

struct ActivityHandler {
    source_name: String,
    duration: Gauge,
    count: Counter,
    errors: Counter,
}

fn labels_of(activity: &Activity) -> LabelSet {
    activity
        .tags
        .clone()
        .with_label("operation", activity.operation.as_str())
}

impl ListenerHandler for ActivityHandler {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    fn on_stop(&self, activity: &Activity) {
        let labels = labels_of(activity);
        if let Some(duration) = activity.duration {
            self.duration.set(duration.as_secs_f64() * 1000.0, &labels);
        }
        self.count.increment(&labels);
    }

    fn on_exception(&self, activity: Option<&Activity>, _message: &str) {
        let labels = activity.map(labels_of).unwrap_or_default();
        self.errors.increment(&labels);
    }
}

/// Turns the activity events of one named source into metrics.
///
/// Each stopped activity updates [`DURATION_METRIC`] and [`COUNT_METRIC`];
/// each failure bumps [`ERRORS_METRIC`]. Series are labelled with the
/// activity tags plus its `operation`.
pub struct ActivityCollector {
    name: String,
    manager: SubscriptionManager,
}

impl ActivityCollector {
    /// Subscribes to every source called `source_name` in `registry`,
    /// present or future.
    pub fn new(
        meter: &Meter,
        source_name: impl Into<String>,
        registry: Arc<EventSourceRegistry>,
    ) -> MetricsResult<Self> {
        let source_name = source_name.into();
        let handler = ActivityHandler {
            source_name: source_name.clone(),
            duration: meter.create_gauge(DURATION_METRIC)?,
            count: meter.create_counter(COUNT_METRIC)?,
            errors: meter.create_counter(ERRORS_METRIC)?,
        };

        let manager = SubscriptionManager::for_handler(registry, Arc::new(handler), None);
        manager.subscribe();

        Ok(Self {
            name: source_name,
            manager,
        })
    }

    /// A factory for [`MeterBuilder::add_collector`](crate::MeterBuilder::add_collector).
    pub fn factory(
        source_name: impl Into<String>,
        registry: Arc<EventSourceRegistry>,
    ) -> CollectorFactory {
        let source_name = source_name.into();
        Arc::new(move |meter: Meter| -> MetricsResult<Box<dyn Collector>> {
            let collector = ActivityCollector::new(&meter, source_name.clone(), registry.clone())?;
            Ok(Box::new(collector))
        })
    }

    /// Number of sources currently observed.
    pub fn subscription_count(&self) -> usize {
        self.manager.subscription_count()
    }
}

impl Collector for ActivityCollector {
    fn name(&self) -> &str {
        &self.name
    }

    fn shutdown(&self) {
        if self.manager.dispose() {
            log::debug!("Activity collector '{}' unsubscribed.", self.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NoOpProcessor;
    use meridian_core::event::Event;
    use std::time::Duration;

    fn meter() -> Meter {
        Meter::new("Test.Source", "1.0", Arc::new(NoOpProcessor))
    }

    #[test]
    fn test_stopped_activity_updates_metrics() {
        let registry = EventSourceRegistry::new();
        let meter = meter();
        let collector = ActivityCollector::new(&meter, "Test.Source", registry.clone()).unwrap();
        let source = registry.create_source("Test.Source");
        assert_eq!(collector.subscription_count(), 1);

        let activity = Activity::start("HttpIn").with_tag("route", "/home");
        source.write(&Event::activity_start(activity.clone()));
        source.write(&Event::activity_stop(
            activity.clone().stopped(Duration::from_millis(250)),
        ));
        source.write(&Event::activity_exception(activity, "timeout"));

        let labels = LabelSet::new([("route", "/home"), ("operation", "HttpIn")]);
        let duration = meter.create_gauge(DURATION_METRIC).unwrap();
        let count = meter.create_counter(COUNT_METRIC).unwrap();
        let errors = meter.create_counter(ERRORS_METRIC).unwrap();
        assert_eq!(duration.get(&labels), Some(250.0));
        assert_eq!(count.get(&labels), Some(1));
        assert_eq!(errors.get(&labels), Some(1));
    }

    #[test]
    fn test_other_sources_are_ignored() {
        let registry = EventSourceRegistry::new();
        let meter = meter();
        let collector = ActivityCollector::new(&meter, "Test.Source", registry.clone()).unwrap();
        let other = registry.create_source("Other.Source");

        other.write(&Event::activity_stop(
            Activity::start("Op").stopped(Duration::from_millis(1)),
        ));

        assert_eq!(collector.subscription_count(), 0);
        assert_eq!(other.listener_count(), 0);
    }

    #[test]
    fn test_shutdown_unsubscribes() {
        let registry = EventSourceRegistry::new();
        let meter = meter();
        let source = registry.create_source("Test.Source");
        let collector = ActivityCollector::new(&meter, "Test.Source", registry.clone()).unwrap();
        assert_eq!(source.listener_count(), 1);

        collector.shutdown();
        assert_eq!(source.listener_count(), 0);
        assert_eq!(registry.observer_count(), 0);
    }

    #[test]
    fn test_name_clash_fails_construction() {
        let registry = EventSourceRegistry::new();
        let meter = meter();
        meter.create_counter(DURATION_METRIC).unwrap();
        assert!(ActivityCollector::new(&meter, "Test.Source", registry).is_err());
    }
}
