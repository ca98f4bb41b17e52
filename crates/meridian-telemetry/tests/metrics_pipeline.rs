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

use anyhow::Result;
use meridian_core::event::{Activity, Event, EventSourceRegistry};
use meridian_core::telemetry::{LabelSet, MetricProcessor, MetricRecord, MetricValue};
use meridian_telemetry::{
    ActivityCollector, InMemoryExporter, MeterBuilder, MeterFactory, ProcessorPipelineBuilder,
    TransformProcessor,
};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn quiet_builder(exporter: &Arc<InMemoryExporter>) -> MeterBuilder {
    MeterBuilder::new()
        .add_processor_pipeline(ProcessorPipelineBuilder::new().set_exporter(exporter.clone()))
        .collection_interval(Duration::from_secs(3600))
        .event_registry(EventSourceRegistry::new())
}

#[test]
fn gauge_updates_are_exported_once_per_cycle() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let exporter = Arc::new(InMemoryExporter::new());
    let factory = quiet_builder(&exporter).build()?;

    let labels = LabelSet::new([("host", "a"), ("region", "eu")]);
    let gauge = factory.get_meter("system", "1.0").create_gauge("cpu")?;

    gauge.set(100.0, &labels);
    factory.collect_all();
    gauge.set(200.0, &labels);
    factory.collect_all();
    // Nothing changed since the last cycle.
    factory.collect_all();

    let batches = exporter.batches();
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].len(), 1);
    assert_eq!(batches[1].len(), 1);
    assert_eq!(batches[0][0].value, MetricValue::Gauge(100.0));
    assert_eq!(batches[1][0].value, MetricValue::Gauge(200.0));
    assert_eq!(batches[0][0].id, batches[1][0].id);
    assert_eq!(batches[1][0].id.labels, labels);
    assert_eq!(
        batches[1][0].id.to_string_formatted(),
        "system:cpu[host=a,region=eu]"
    );
    Ok(())
}

#[test]
fn transform_stage_sees_records_before_the_exporter() -> Result<()> {
    let exporter = Arc::new(InMemoryExporter::new());
    let pipeline = ProcessorPipelineBuilder::new()
        .add_processor(TransformProcessor::factory(|mut record: MetricRecord| {
            record.id = record.id.with_label("env", "test");
            Some(record)
        }))
        .set_exporter(exporter.clone());
    let factory = MeterBuilder::new()
        .add_processor_pipeline(pipeline)
        .collection_interval(Duration::from_secs(3600))
        .build()?;

    factory
        .default_meter()
        .create_counter("jobs")?
        .add(3, &LabelSet::empty());
    factory.collect_all();

    let records = exporter.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id.labels.get("env"), Some("test"));
    assert_eq!(records[0].value, MetricValue::Counter(3));
    Ok(())
}

#[test]
fn registry_without_pipeline_discards_everything() -> Result<()> {
    let factory = MeterBuilder::new()
        .collection_interval(Duration::from_secs(3600))
        .build()?;
    factory
        .get_meter("m", "1")
        .create_gauge("g")?
        .set(1.0, &LabelSet::empty());

    let stats = factory.collect_all();
    assert_eq!(stats.records, 1);
    assert_eq!(stats.failed, 0);
    Ok(())
}

#[test]
fn activity_collector_feeds_its_meter() -> Result<()> {
    let registry = EventSourceRegistry::new();
    let exporter = Arc::new(InMemoryExporter::new());
    let factory = quiet_builder(&exporter)
        .add_collector_factory(
            "Test.Source",
            "1.0",
            ActivityCollector::factory("Test.Source", registry.clone()),
        )
        .build()?;
    assert_eq!(factory.collector_count(), 1);

    let source = registry.create_source("Test.Source");
    let activity = Activity::start("Checkout");
    source.write(&Event::activity_start(activity.clone()));
    source.write(&Event::activity_stop(
        activity.stopped(Duration::from_millis(12)),
    ));
    factory.collect_all();

    let records = exporter.records();
    let count = records
        .iter()
        .find(|r| r.id.name == "activity.count")
        .expect("count record");
    assert_eq!(count.id.meter, "Test.Source");
    assert_eq!(count.id.labels.get("operation"), Some("Checkout"));
    assert_eq!(count.value, MetricValue::Counter(1));

    factory.shutdown();
    assert_eq!(source.listener_count(), 0);
    Ok(())
}

#[test]
fn background_worker_exports_without_explicit_collection() -> Result<()> {
    let exporter = Arc::new(InMemoryExporter::new());
    let factory = MeterBuilder::new()
        .add_processor_pipeline(ProcessorPipelineBuilder::new().set_exporter(exporter.clone()))
        .collection_interval(Duration::from_millis(20))
        .event_registry(EventSourceRegistry::new())
        .build()?;
    assert!(factory.is_collecting());

    factory
        .default_meter()
        .create_gauge("ticks")?
        .set(1.0, &LabelSet::empty());

    let deadline = Instant::now() + Duration::from_secs(5);
    while exporter.batch_count() == 0 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(exporter.batch_count(), 1);
    assert!(factory.cycle_count() >= 1);

    factory.shutdown();
    assert!(!factory.is_collecting());
    assert!(exporter.is_shut_down());
    Ok(())
}

#[test]
fn processor_shutdown_runs_once_through_drop() {
    let exporter = Arc::new(InMemoryExporter::new());
    let processor: Arc<dyn MetricProcessor> = ProcessorPipelineBuilder::new()
        .set_exporter(exporter.clone())
        .build();
    {
        let factory = MeterFactory::with_processor(processor);
        factory
            .default_meter()
            .create_counter("c")
            .unwrap()
            .increment(&LabelSet::empty());
        factory.collect_all();
    }
    assert!(exporter.is_shut_down());
    assert_eq!(exporter.batch_count(), 1);
}
