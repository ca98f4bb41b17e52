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

use super::instruments::{Counter, Gauge, InstrumentCore};
use meridian_core::telemetry::{MetricProcessor, MetricType, MetricsError, MetricsResult};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

struct MeterInner {
    name: String,
    version: String,
    processor: Arc<dyn MetricProcessor>,
    instruments: Mutex<BTreeMap<String, Arc<InstrumentCore>>>,
}

/// A named container of instruments.
///
/// A meter is identified by `(name, version)`; the meter with an empty name
/// is the registry's default meter. Cloning yields another handle to the
/// same meter. Application code records through the instruments; only the
/// collection cycle reads them back through [`collect`](Meter::collect).
#[derive(Clone)]
pub struct Meter {
    inner: Arc<MeterInner>,
}

impl Meter {
    pub(crate) fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        processor: Arc<dyn MetricProcessor>,
    ) -> Self {
        Self {
            inner: Arc::new(MeterInner {
                name: name.into(),
                version: version.into(),
                processor,
                instruments: Mutex::new(BTreeMap::new()),
            }),
        }
    }

    /// The meter name. Empty for the default meter.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The meter version.
    pub fn version(&self) -> &str {
        &self.inner.version
    }

    fn instrument(&self, name: &str, kind: MetricType) -> MetricsResult<Arc<InstrumentCore>> {
        let mut instruments = self
            .inner
            .instruments
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = instruments.get(name) {
            if existing.kind() != kind {
                return Err(MetricsError::TypeMismatch {
                    expected: kind,
                    found: existing.kind(),
                });
            }
            return Ok(existing.clone());
        }

        let core = InstrumentCore::new(&self.inner.name, name, kind);
        instruments.insert(name.to_string(), core.clone());
        log::debug!(
            "Registered {:?} '{}' on meter '{}'",
            kind,
            name,
            self.inner.name
        );
        Ok(core)
    }

    /// Returns the gauge called `name`, creating it on first use.
    pub fn create_gauge(&self, name: &str) -> MetricsResult<Gauge> {
        self.instrument(name, MetricType::Gauge).map(Gauge::new)
    }

    /// Returns the counter called `name`, creating it on first use.
    pub fn create_counter(&self, name: &str) -> MetricsResult<Counter> {
        self.instrument(name, MetricType::Counter).map(Counter::new)
    }

    /// Number of instruments on this meter.
    pub fn instrument_count(&self) -> usize {
        self.inner
            .instruments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Checkpoints every instrument and pushes the updated series into the
    /// processor chain. Returns how many records were accepted.
    ///
    /// A rejected record does not stop the others: every checkpointed record
    /// is offered to the chain, and the first error is returned afterwards.
    pub fn collect(&self) -> MetricsResult<usize> {
        let instruments: Vec<Arc<InstrumentCore>> = self
            .inner
            .instruments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        let mut pushed = 0;
        let mut first_error = None;
        for instrument in instruments {
            for record in instrument.checkpoint() {
                match self.inner.processor.process(record) {
                    Ok(()) => pushed += 1,
                    Err(e) => {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(pushed),
        }
    }

    /// Returns `true` if both handles refer to the same meter.
    pub fn ptr_eq(&self, other: &Meter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Meter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Meter")
            .field("name", &self.inner.name)
            .field("version", &self.inner.version)
            .field("instruments", &self.instrument_count())
            .finish()
    }
}
