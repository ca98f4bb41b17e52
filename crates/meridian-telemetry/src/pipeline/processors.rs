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

//! Built-in processing stages.

use meridian_core::telemetry::{
    ExportResult, MetricExporter, MetricProcessor, MetricRecord, MetricsResult,
};
use meridian_core::SdkEventSource;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Terminal stage used when nothing is configured: accepts and drops.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpProcessor;

impl MetricProcessor for NoOpProcessor {
    fn process(&self, _record: MetricRecord) -> MetricsResult<()> {
        Ok(())
    }

    fn end_collection(&self) -> MetricsResult<()> {
        Ok(())
    }
}

/// Default cap on records carried over after retryable export failures.
pub const DEFAULT_MAX_CARRY_OVER: usize = 10_000;

/// Terminal stage that exports everything collected in a cycle as one batch.
///
/// Records are not grouped or merged. When the exporter asks for a retry the
/// batch is kept and offered again with the next cycle's records; the oldest
/// records are dropped beyond [`DEFAULT_MAX_CARRY_OVER`].
pub struct UngroupedBatcher {
    exporter: Arc<dyn MetricExporter>,
    batch: Mutex<Vec<MetricRecord>>,
    max_carry_over: usize,
    diagnostics: SdkEventSource,
}

impl UngroupedBatcher {
    /// Batches for `exporter`, reporting failures on the global SDK source.
    pub fn new(exporter: Arc<dyn MetricExporter>) -> Self {
        Self {
            exporter,
            batch: Mutex::new(Vec::new()),
            max_carry_over: DEFAULT_MAX_CARRY_OVER,
            diagnostics: SdkEventSource::global().clone(),
        }
    }

    /// Caps the records kept for a retry.
    pub fn with_max_carry_over(mut self, max: usize) -> Self {
        self.max_carry_over = max;
        self
    }

    /// Reports export failures on `diagnostics` instead of the global source.
    pub fn with_diagnostics(mut self, diagnostics: SdkEventSource) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Records waiting for the next export.
    pub fn pending(&self) -> usize {
        self.batch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn flush(&self) {
        let batch = std::mem::take(&mut *self.batch.lock().unwrap_or_else(PoisonError::into_inner));
        if batch.is_empty() {
            return;
        }

        match self.exporter.export(&batch) {
            ExportResult::Success => {
                log::trace!("Exported {} records.", batch.len());
            }
            ExportResult::FailedRetryable => {
                log::warn!(
                    "Exporter rejected {} records, keeping them for the next cycle.",
                    batch.len()
                );
                self.diagnostics.export_failed(batch.len(), true);
                self.carry_over(batch);
            }
            ExportResult::FailedNotRetryable => {
                log::warn!("Exporter rejected {} records, dropping them.", batch.len());
                self.diagnostics.export_failed(batch.len(), false);
            }
        }
    }

    fn carry_over(&self, mut kept: Vec<MetricRecord>) {
        let mut batch = self.batch.lock().unwrap_or_else(PoisonError::into_inner);
        // Older records go first.
        kept.append(&mut batch);
        if kept.len() > self.max_carry_over {
            let excess = kept.len() - self.max_carry_over;
            kept.drain(..excess);
            log::debug!("Dropped {} carried-over records.", excess);
        }
        *batch = kept;
    }
}

impl MetricProcessor for UngroupedBatcher {
    fn process(&self, record: MetricRecord) -> MetricsResult<()> {
        self.batch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
        Ok(())
    }

    fn end_collection(&self) -> MetricsResult<()> {
        self.flush();
        Ok(())
    }

    fn shutdown(&self) {
        self.flush();
        self.exporter.shutdown();
    }
}

impl fmt::Debug for UngroupedBatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UngroupedBatcher")
            .field("pending", &self.pending())
            .field("max_carry_over", &self.max_carry_over)
            .finish()
    }
}

type Transform = Arc<dyn Fn(MetricRecord) -> Option<MetricRecord> + Send + Sync>;

/// A stage that rewrites or drops records before forwarding them.
pub struct TransformProcessor {
    transform: Transform,
    downstream: Box<dyn MetricProcessor>,
}

impl TransformProcessor {
    /// Applies `transform` to each record; `None` drops it.
    pub fn new<F>(downstream: Box<dyn MetricProcessor>, transform: F) -> Self
    where
        F: Fn(MetricRecord) -> Option<MetricRecord> + Send + Sync + 'static,
    {
        Self {
            transform: Arc::new(transform),
            downstream,
        }
    }

    /// A stage factory for [`ProcessorPipelineBuilder::add_processor`].
    ///
    /// [`ProcessorPipelineBuilder::add_processor`]: super::ProcessorPipelineBuilder::add_processor
    pub fn factory<F>(
        transform: F,
    ) -> impl Fn(Box<dyn MetricProcessor>) -> Box<dyn MetricProcessor> + Send + Sync + 'static
    where
        F: Fn(MetricRecord) -> Option<MetricRecord> + Send + Sync + 'static,
    {
        let transform: Transform = Arc::new(transform);
        move |downstream: Box<dyn MetricProcessor>| -> Box<dyn MetricProcessor> {
            Box::new(TransformProcessor {
                transform: transform.clone(),
                downstream,
            })
        }
    }
}

impl MetricProcessor for TransformProcessor {
    fn process(&self, record: MetricRecord) -> MetricsResult<()> {
        match (self.transform)(record) {
            Some(record) => self.downstream.process(record),
            None => Ok(()),
        }
    }

    fn end_collection(&self) -> MetricsResult<()> {
        self.downstream.end_collection()
    }

    fn shutdown(&self) {
        self.downstream.shutdown();
    }
}
