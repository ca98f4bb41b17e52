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

//! Exporters shipped with the SDK.

use meridian_core::telemetry::{ExportResult, MetricExporter, MetricRecord};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// Exporter that keeps every batch it receives in memory.
///
/// Useful in tests and for inspecting what a pipeline emits.
#[derive(Debug, Default)]
pub struct InMemoryExporter {
    batches: RwLock<Vec<Vec<MetricRecord>>>,
    shut_down: AtomicBool,
}

impl InMemoryExporter {
    /// Create a new, empty exporter
    pub fn new() -> Self {
        Self::default()
    }

    /// All batches received, oldest first
    pub fn batches(&self) -> Vec<Vec<MetricRecord>> {
        self.batches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of batches received
    pub fn batch_count(&self) -> usize {
        self.batches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every record received, flattened in arrival order
    pub fn records(&self) -> Vec<MetricRecord> {
        self.batches
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flatten()
            .cloned()
            .collect()
    }

    /// Forget everything received so far
    pub fn clear(&self) {
        self.batches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Whether `shutdown` was called
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }
}

impl MetricExporter for InMemoryExporter {
    fn export(&self, batch: &[MetricRecord]) -> ExportResult {
        if self.is_shut_down() {
            return ExportResult::FailedNotRetryable;
        }
        self.batches
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(batch.to_vec());
        ExportResult::Success
    }

    fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
    }
}
