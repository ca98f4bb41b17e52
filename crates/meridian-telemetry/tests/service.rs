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
use meridian_core::event::EventSourceRegistry;
use meridian_core::telemetry::{ExportResult, LabelSet, MetricExporter, MetricRecord};
use meridian_telemetry::{
    ConfigError, MeterBuilder, ProcessorPipelineBuilder, TelemetryConfig, TelemetryService,
};
use std::sync::Arc;

/// Rejects every batch for good.
struct Rejecting;

impl MetricExporter for Rejecting {
    fn export(&self, _batch: &[MetricRecord]) -> ExportResult {
        ExportResult::FailedNotRetryable
    }
}

fn config_in(dir: &std::path::Path, interval_ms: u64) -> Result<TelemetryConfig> {
    let json = format!(
        r#"{{
            "collection_interval_ms": {},
            "self_diagnostics": {{ "LogDirectory": {}, "FileSize": 1024, "LogLevel": "Warning" }}
        }}"#,
        interval_ms,
        serde_json::to_string(dir)?
    );
    Ok(TelemetryConfig::from_json(&json)?)
}

#[test]
fn export_failures_reach_the_self_diagnostics_file() -> Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir()?;
    let builder = MeterBuilder::new()
        .add_processor_pipeline(ProcessorPipelineBuilder::new().set_exporter(Arc::new(Rejecting)));
    let mut service = TelemetryService::with_registry(
        config_in(dir.path(), 3_600_000)?,
        builder,
        EventSourceRegistry::new(),
    );

    service.start()?;
    let path = service
        .self_diagnostics()
        .map(|d| d.path().to_path_buf())
        .expect("self-diagnostics configured");
    assert!(path.starts_with(dir.path()));

    let factory = service.meter_factory().expect("running");
    factory
        .get_meter("orders", "1")
        .create_counter("placed")?
        .add(2, &LabelSet::empty());
    factory.collect_all();
    service.stop();

    let bytes = std::fs::read(&path)?;
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("Exporter rejected a batch{1}{false}"));
    Ok(())
}

#[test]
fn start_is_idempotent_and_stop_releases_everything() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let mut service = TelemetryService::with_registry(
        config_in(dir.path(), 50)?,
        MeterBuilder::new(),
        EventSourceRegistry::new(),
    );

    service.start()?;
    service.start()?;
    assert!(service.is_running());
    assert!(service.meter_factory().expect("running").is_collecting());
    assert!(service.self_diagnostics().expect("configured").listener().is_active());

    service.stop();
    assert!(!service.is_running());
    assert!(service.self_diagnostics().is_none());
    service.stop();
    Ok(())
}

#[test]
fn builder_errors_surface_from_start() {
    let mut service = TelemetryService::with_registry(
        TelemetryConfig::default(),
        MeterBuilder::new()
            .add_processor_pipeline(ProcessorPipelineBuilder::new())
            .add_processor_pipeline(ProcessorPipelineBuilder::new()),
        EventSourceRegistry::new(),
    );

    assert!(matches!(
        service.start(),
        Err(ConfigError::MultiplePipelines(2))
    ));
    assert!(!service.is_running());
}

#[test]
fn configuration_file_round_trip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("telemetry.json");
    let config = config_in(dir.path(), 250)?;

    config.to_file(&path)?;
    let loaded = TelemetryConfig::from_file(&path)?;
    assert_eq!(loaded, config);
    assert_eq!(loaded.collection_interval().as_millis(), 250);
    Ok(())
}
