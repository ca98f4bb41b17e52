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

//! Contracts for the stages of the metric processing chain.

use super::metrics::{MetricRecord, MetricsResult};

/// One link in the metric processing chain.
///
/// A stage receives every update of a collection cycle through
/// [`process`](MetricProcessor::process) and is told the cycle is over through
/// [`end_collection`](MetricProcessor::end_collection). Transformation stages
/// forward both calls to the downstream stage they own; the terminal stage
/// performs the export.
pub trait MetricProcessor: Send + Sync + 'static {
    /// Handles one aggregated update.
    fn process(&self, record: MetricRecord) -> MetricsResult<()>;

    /// Signals that every meter has been collected for the current cycle.
    fn end_collection(&self) -> MetricsResult<()>;

    /// Releases resources held by the stage (and its downstream).
    fn shutdown(&self) {}
}

impl<P: MetricProcessor + ?Sized> MetricProcessor for Box<P> {
    fn process(&self, record: MetricRecord) -> MetricsResult<()> {
        (**self).process(record)
    }

    fn end_collection(&self) -> MetricsResult<()> {
        (**self).end_collection()
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}

/// Outcome of handing a batch to an exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportResult {
    /// The batch was accepted.
    Success,
    /// The batch was rejected but may succeed if offered again next cycle.
    FailedRetryable,
    /// The batch was rejected and must not be offered again.
    FailedNotRetryable,
}

/// Terminal sink that transmits aggregated metrics out of process.
pub trait MetricExporter: Send + Sync + 'static {
    /// Exports one batch of records.
    fn export(&self, batch: &[MetricRecord]) -> ExportResult;

    /// Flushes and releases the sink.
    fn shutdown(&self) {}
}
