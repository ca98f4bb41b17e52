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

use super::builder::MeterBuilder;
use super::meter::Meter;
use crate::collectors::Collector;
use crate::error::ConfigError;
use crate::pipeline::NoOpProcessor;
use crate::scheduler::{panic_message, CollectionWorker};
use meridian_core::telemetry::MetricProcessor;
use meridian_core::SdkEventSource;
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Outcome of one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Meters visited, the default meter included.
    pub meters: usize,
    /// Records pushed into the processor chain.
    pub records: usize,
    /// Meters whose collection failed.
    pub failed: usize,
}

struct FactoryInner {
    processor: Arc<dyn MetricProcessor>,
    default_meter: Meter,
    meters: Mutex<HashMap<(String, String), Meter>>,
    diagnostics: SdkEventSource,
    // Serializes cycles run by the worker and by `collect_all`.
    cycle: Mutex<()>,
    cycles: AtomicU64,
}

impl FactoryInner {
    fn collect_cycle(&self) -> CycleStats {
        let _guard = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);

        let mut meters: Vec<Meter> = self
            .meters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        meters.push(self.default_meter.clone());

        let mut stats = CycleStats {
            meters: meters.len(),
            ..CycleStats::default()
        };

        for meter in &meters {
            match panic::catch_unwind(AssertUnwindSafe(|| meter.collect())) {
                Ok(Ok(records)) => stats.records += records,
                Ok(Err(e)) => {
                    stats.failed += 1;
                    self.report_failure(meter, &e.to_string());
                }
                Err(payload) => {
                    stats.failed += 1;
                    self.report_failure(meter, &panic_message(payload.as_ref()));
                }
            }
        }

        let end = panic::catch_unwind(AssertUnwindSafe(|| self.processor.end_collection()));
        match end {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::warn!("Processor chain failed to end collection: {}", e),
            Err(payload) => log::warn!(
                "Processor chain panicked while ending collection: {}",
                panic_message(payload.as_ref())
            ),
        }

        self.cycles.fetch_add(1, Ordering::Relaxed);
        log::trace!(
            "Collection cycle done: {} meters, {} records, {} failed.",
            stats.meters,
            stats.records,
            stats.failed
        );
        stats
    }

    fn report_failure(&self, meter: &Meter, error: &str) {
        log::warn!("Failed to collect meter '{}': {}", meter.name(), error);
        self.diagnostics.collection_failed(meter.name(), error);
    }
}

/// The meter registry.
///
/// Hands out meters by `(name, version)`, owns the collectors built for it,
/// and runs collection cycles, either on demand through
/// [`collect_all`](Self::collect_all) or on the background worker configured
/// by the [`MeterBuilder`].
pub struct MeterFactory {
    inner: Arc<FactoryInner>,
    worker: Mutex<Option<CollectionWorker>>,
    collectors: Mutex<Vec<Box<dyn Collector>>>,
    shut_down: AtomicBool,
}

impl MeterFactory {
    /// Starts describing a registry.
    pub fn builder() -> MeterBuilder {
        MeterBuilder::new()
    }

    /// A registry feeding `processor`, with no collectors and no worker.
    pub fn with_processor(processor: Arc<dyn MetricProcessor>) -> Self {
        Self::assemble(processor, SdkEventSource::global().clone())
    }

    pub(crate) fn assemble(processor: Arc<dyn MetricProcessor>, diagnostics: SdkEventSource) -> Self {
        let default_meter = Meter::new("", "", processor.clone());
        Self {
            inner: Arc::new(FactoryInner {
                processor,
                default_meter,
                meters: Mutex::new(HashMap::new()),
                diagnostics,
                cycle: Mutex::new(()),
                cycles: AtomicU64::new(0),
            }),
            worker: Mutex::new(None),
            collectors: Mutex::new(Vec::new()),
            shut_down: AtomicBool::new(false),
        }
    }

    pub(crate) fn add_collector(&self, collector: Box<dyn Collector>) {
        log::info!("Registered collector: {}", collector.name());
        self.collectors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(collector);
    }

    pub(crate) fn start_worker(&self, interval: Duration) -> Result<(), ConfigError> {
        let inner = Arc::clone(&self.inner);
        let worker =
            CollectionWorker::spawn(interval, self.inner.diagnostics.clone(), move || {
                inner.collect_cycle();
            })
            .map_err(ConfigError::Worker)?;
        *self.worker.lock().unwrap_or_else(PoisonError::into_inner) = Some(worker);
        Ok(())
    }

    /// Returns the meter for `(name, version)`, creating it on first use.
    /// An empty name yields the default meter.
    pub fn get_meter(&self, name: &str, version: &str) -> Meter {
        if name.is_empty() {
            return self.inner.default_meter.clone();
        }
        self.inner
            .meters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry((name.to_string(), version.to_string()))
            .or_insert_with(|| {
                log::debug!("Created meter '{}' version '{}'", name, version);
                Meter::new(name, version, self.inner.processor.clone())
            })
            .clone()
    }

    /// The unnamed meter.
    pub fn default_meter(&self) -> Meter {
        self.inner.default_meter.clone()
    }

    /// Number of meters, the default meter included.
    pub fn meter_count(&self) -> usize {
        self.inner
            .meters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
            + 1
    }

    /// Number of collectors owned by this registry.
    pub fn collector_count(&self) -> usize {
        self.collectors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Runs one collection cycle now. Does nothing once shut down.
    pub fn collect_all(&self) -> CycleStats {
        if self.is_shut_down() {
            return CycleStats::default();
        }
        self.inner.collect_cycle()
    }

    /// Cycles completed so far, by the worker or on demand.
    pub fn cycle_count(&self) -> u64 {
        self.inner.cycles.load(Ordering::Relaxed)
    }

    /// Whether the background worker is alive.
    pub fn is_collecting(&self) -> bool {
        self.worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(CollectionWorker::is_running)
    }

    /// Whether [`shutdown`](Self::shutdown) ran.
    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Stops the worker, shuts the collectors down, then shuts the processor
    /// chain down. Only the first call has an effect.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }

        self.release_owned();
        let _guard = self.inner.cycle.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.processor.shutdown();
        log::info!("Meter registry shut down.");
    }

    /// Tears down a registry that never started, leaving the processor
    /// chain it was given untouched.
    pub(crate) fn discard(self) {
        if !self.shut_down.swap(true, Ordering::SeqCst) {
            self.release_owned();
            log::debug!("Discarded a partially built meter registry.");
        }
    }

    fn release_owned(&self) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut worker) = worker {
            if let Some(exit) = worker.stop() {
                log::debug!("Collection worker exited: {:?}", exit);
            }
        }

        let collectors: Vec<Box<dyn Collector>> = self
            .collectors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for collector in collectors {
            let name = collector.name().to_string();
            if panic::catch_unwind(AssertUnwindSafe(|| collector.shutdown())).is_err() {
                log::warn!("Collector '{}' panicked during shutdown", name);
            }
        }
    }
}

impl Default for MeterFactory {
    fn default() -> Self {
        Self::with_processor(Arc::new(NoOpProcessor))
    }
}

impl Drop for MeterFactory {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for MeterFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MeterFactory")
            .field("meters", &self.meter_count())
            .field("collectors", &self.collector_count())
            .field("collecting", &self.is_collecting())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
