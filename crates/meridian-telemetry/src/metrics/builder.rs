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

use super::meter::Meter;
use super::registry::MeterFactory;
use crate::collectors::{Collector, CollectorFactory};
use crate::config::DEFAULT_COLLECTION_INTERVAL_MS;
use crate::error::ConfigError;
use crate::pipeline::{NoOpProcessor, ProcessorPipelineBuilder};
use meridian_core::event::EventSourceRegistry;
use meridian_core::telemetry::{MetricProcessor, MetricsResult};
use meridian_core::{SdkEventSource, METRICS_SOURCE_NAME};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
struct CollectorEntry {
    name: String,
    version: String,
    factory: CollectorFactory,
}

/// Configures a [`MeterFactory`].
///
/// At most one processor pipeline may be added. Without one, the registry
/// discards everything, which is only allowed when no collector is
/// configured either.
#[derive(Clone)]
pub struct MeterBuilder {
    pipelines: Vec<ProcessorPipelineBuilder>,
    collectors: Vec<CollectorEntry>,
    collection_interval: Duration,
    event_registry: Option<Arc<EventSourceRegistry>>,
}

impl MeterBuilder {
    /// A builder with the default collection interval.
    pub fn new() -> Self {
        Self {
            pipelines: Vec::new(),
            collectors: Vec::new(),
            collection_interval: Duration::from_millis(DEFAULT_COLLECTION_INTERVAL_MS),
            event_registry: None,
        }
    }

    /// Adds the processor pipeline.
    pub fn add_processor_pipeline(mut self, pipeline: ProcessorPipelineBuilder) -> Self {
        self.pipelines.push(pipeline);
        self
    }

    /// Adds a collector, built with the meter `(name, version)`.
    pub fn add_collector<F>(
        mut self,
        name: impl Into<String>,
        version: impl Into<String>,
        factory: F,
    ) -> Self
    where
        F: Fn(Meter) -> MetricsResult<Box<dyn Collector>> + Send + Sync + 'static,
    {
        self.collectors.push(CollectorEntry {
            name: name.into(),
            version: version.into(),
            factory: Arc::new(factory),
        });
        self
    }

    /// Adds a collector from a shared factory.
    pub fn add_collector_factory(
        mut self,
        name: impl Into<String>,
        version: impl Into<String>,
        factory: CollectorFactory,
    ) -> Self {
        self.collectors.push(CollectorEntry {
            name: name.into(),
            version: version.into(),
            factory,
        });
        self
    }

    /// Sets the interval between background collection cycles.
    pub fn collection_interval(mut self, interval: Duration) -> Self {
        self.collection_interval = interval;
        self
    }

    /// Registry on which the SDK reports its own failures. Defaults to the
    /// process-wide registry.
    pub fn event_registry(mut self, registry: Arc<EventSourceRegistry>) -> Self {
        self.event_registry = Some(registry);
        self
    }

    /// Builds the registry, its collectors, and starts the worker.
    pub fn build(&self) -> Result<MeterFactory, ConfigError> {
        if self.collection_interval.is_zero() {
            return Err(ConfigError::InvalidInterval);
        }

        let diagnostics = match &self.event_registry {
            Some(registry) => SdkEventSource::new(registry, METRICS_SOURCE_NAME),
            None => SdkEventSource::global().clone(),
        };

        let processor: Arc<dyn MetricProcessor> = match self.pipelines.as_slice() {
            [] if !self.collectors.is_empty() => return Err(ConfigError::MissingPipeline),
            [] => Arc::new(NoOpProcessor),
            [pipeline] => pipeline.build_with_diagnostics(&diagnostics),
            pipelines => return Err(ConfigError::MultiplePipelines(pipelines.len())),
        };

        let factory = MeterFactory::assemble(processor, diagnostics);
        for entry in &self.collectors {
            let meter = factory.get_meter(&entry.name, &entry.version);
            match (entry.factory)(meter) {
                Ok(collector) => factory.add_collector(collector),
                Err(source) => {
                    factory.discard();
                    return Err(ConfigError::Collector {
                        name: entry.name.clone(),
                        source,
                    });
                }
            }
        }

        if let Err(e) = factory.start_worker(self.collection_interval) {
            factory.discard();
            return Err(e);
        }
        log::info!(
            "Meter registry started with {} collectors, collecting every {:?}.",
            self.collectors.len(),
            self.collection_interval
        );
        Ok(factory)
    }
}

impl Default for MeterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MeterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterBuilder")
            .field("pipelines", &self.pipelines)
            .field("collectors", &self.collectors.len())
            .field("collection_interval", &self.collection_interval)
            .field("event_registry", &self.event_registry.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::InMemoryExporter;
    use meridian_core::telemetry::MetricsError;

    struct Idle;

    impl Collector for Idle {
        fn name(&self) -> &str {
            "idle"
        }
    }

    fn idle(_meter: Meter) -> MetricsResult<Box<dyn Collector>> {
        Ok(Box::new(Idle))
    }

    #[test]
    fn test_collectors_require_a_pipeline() {
        let result = MeterBuilder::new().add_collector("c", "1", idle).build();
        assert!(matches!(result, Err(ConfigError::MissingPipeline)));
    }

    #[test]
    fn test_only_one_pipeline_is_accepted() {
        let result = MeterBuilder::new()
            .add_processor_pipeline(ProcessorPipelineBuilder::new())
            .add_processor_pipeline(ProcessorPipelineBuilder::new())
            .build();
        assert!(matches!(result, Err(ConfigError::MultiplePipelines(2))));
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let result = MeterBuilder::new()
            .collection_interval(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidInterval)));
    }

    #[test]
    fn test_collector_failure_names_the_collector() {
        let result = MeterBuilder::new()
            .add_processor_pipeline(
                ProcessorPipelineBuilder::new().set_exporter(Arc::new(InMemoryExporter::new())),
            )
            .add_collector("broken", "1", |_meter: Meter| -> MetricsResult<Box<dyn Collector>> {
                Err(MetricsError::InvalidOperation("no".to_string()))
            })
            .build();

        match result {
            Err(ConfigError::Collector { name, .. }) => assert_eq!(name, "broken"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    /// Counts shutdowns so a test can see which collectors were released.
    struct Tracked(Arc<std::sync::atomic::AtomicUsize>);

    impl Collector for Tracked {
        fn name(&self) -> &str {
            "tracked"
        }

        fn shutdown(&self) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn test_failed_build_leaves_exporter_live() {
        let exporter = Arc::new(InMemoryExporter::new());
        let released = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = released.clone();
        let builder = MeterBuilder::new()
            .add_processor_pipeline(ProcessorPipelineBuilder::new().set_exporter(exporter.clone()))
            .add_collector("ok", "1", move |_meter: Meter| -> MetricsResult<Box<dyn Collector>> {
                Ok(Box::new(Tracked(counter.clone())))
            })
            .add_collector("broken", "1", |_meter: Meter| -> MetricsResult<Box<dyn Collector>> {
                Err(MetricsError::InvalidOperation("no".to_string()))
            })
            .collection_interval(Duration::from_secs(3600))
            .event_registry(EventSourceRegistry::new());

        assert!(builder.build().is_err());
        assert!(!exporter.is_shut_down());
        assert_eq!(released.load(std::sync::atomic::Ordering::SeqCst), 1);

        // The exporter still accepts batches from a working registry.
        let factory = MeterBuilder::new()
            .add_processor_pipeline(ProcessorPipelineBuilder::new().set_exporter(exporter.clone()))
            .collection_interval(Duration::from_secs(3600))
            .build()
            .unwrap();
        factory
            .default_meter()
            .create_gauge("g")
            .unwrap()
            .set(1.0, &meridian_core::telemetry::LabelSet::empty());
        factory.collect_all();
        assert_eq!(exporter.batch_count(), 1);
    }

    #[test]
    fn test_build_starts_worker_and_registers_collectors() {
        let factory = MeterBuilder::new()
            .add_processor_pipeline(ProcessorPipelineBuilder::new())
            .add_collector("c", "1", idle)
            .collection_interval(Duration::from_secs(60))
            .event_registry(EventSourceRegistry::new())
            .build()
            .unwrap();

        assert!(factory.is_collecting());
        assert_eq!(factory.collector_count(), 1);
        assert_eq!(factory.meter_count(), 2);

        factory.shutdown();
        assert!(!factory.is_collecting());
    }
}
