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

//! Declarative construction of processor chains.

use super::processors::{NoOpProcessor, UngroupedBatcher};
use meridian_core::telemetry::{MetricExporter, MetricProcessor};
use meridian_core::SdkEventSource;
use std::fmt;
use std::sync::Arc;

/// Builds one stage around the downstream stage it will own.
pub type StageFactory =
    Arc<dyn Fn(Box<dyn MetricProcessor>) -> Box<dyn MetricProcessor> + Send + Sync>;

/// Builds the terminal stage from the configured exporter, if any.
pub type ExportingProcessorFactory =
    Arc<dyn Fn(Option<Arc<dyn MetricExporter>>) -> Box<dyn MetricProcessor> + Send + Sync>;

/// Describes a processor chain: ordered stages and a terminal exporter.
///
/// The first stage added sees every update first; the stage next to the
/// exporter sees it last. The description is reusable: every
/// [`build`](Self::build) produces a fresh, identically shaped chain.
#[derive(Clone, Default)]
pub struct ProcessorPipelineBuilder {
    stages: Vec<StageFactory>,
    exporter: Option<Arc<dyn MetricExporter>>,
    exporting_processor: Option<ExportingProcessorFactory>,
}

impl ProcessorPipelineBuilder {
    /// An empty description. Built as is, it yields a [`NoOpProcessor`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage.
    pub fn add_processor<F>(mut self, factory: F) -> Self
    where
        F: Fn(Box<dyn MetricProcessor>) -> Box<dyn MetricProcessor> + Send + Sync + 'static,
    {
        self.stages.push(Arc::new(factory));
        self
    }

    /// Sets the exporter. The last call wins.
    pub fn set_exporter(mut self, exporter: Arc<dyn MetricExporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Replaces the default terminal stage (an [`UngroupedBatcher`] around
    /// the exporter).
    pub fn set_exporting_processor<F>(mut self, factory: F) -> Self
    where
        F: Fn(Option<Arc<dyn MetricExporter>>) -> Box<dyn MetricProcessor> + Send + Sync + 'static,
    {
        self.exporting_processor = Some(Arc::new(factory));
        self
    }

    /// Number of stages added so far, the terminal one excluded.
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Builds the chain and returns its entry stage.
    pub fn build(&self) -> Arc<dyn MetricProcessor> {
        self.build_with_diagnostics(SdkEventSource::global())
    }

    /// Like [`build`](Self::build), with export failures of the default
    /// terminal stage reported on `diagnostics`.
    pub fn build_with_diagnostics(&self, diagnostics: &SdkEventSource) -> Arc<dyn MetricProcessor> {
        let terminal: Box<dyn MetricProcessor> = match (&self.exporting_processor, &self.exporter) {
            (Some(factory), exporter) => factory(exporter.clone()),
            (None, Some(exporter)) => Box::new(
                UngroupedBatcher::new(exporter.clone()).with_diagnostics(diagnostics.clone()),
            ),
            (None, None) => Box::new(NoOpProcessor),
        };

        let entry = self
            .stages
            .iter()
            .rev()
            .fold(terminal, |downstream, factory| factory(downstream));

        log::debug!(
            "Built processor pipeline with {} stages (exporter: {}).",
            self.stages.len(),
            self.exporter.is_some()
        );
        Arc::from(entry)
    }
}

impl fmt::Debug for ProcessorPipelineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorPipelineBuilder")
            .field("stages", &self.stages.len())
            .field("exporter", &self.exporter.is_some())
            .field("exporting_processor", &self.exporting_processor.is_some())
            .finish()
    }
}
