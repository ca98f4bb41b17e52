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

//! Collectors: components that feed a meter from outside the application's
//! own instrumentation.

mod activity;

pub use activity::{ActivityCollector, COUNT_METRIC, DURATION_METRIC, ERRORS_METRIC};

use crate::metrics::Meter;
use meridian_core::telemetry::MetricsResult;
use std::sync::Arc;

/// A component owned by the meter registry for its whole lifetime.
///
/// The registry builds each collector with a dedicated [`Meter`] and calls
/// [`shutdown`](Collector::shutdown) on teardown.
pub trait Collector: Send + Sync + 'static {
    /// Name used in logs and diagnostics.
    fn name(&self) -> &str;

    /// Stops feeding the meter and releases subscriptions.
    fn shutdown(&self) {}
}

/// Builds a collector from the meter resolved for it.
pub type CollectorFactory = Arc<dyn Fn(Meter) -> MetricsResult<Box<dyn Collector>> + Send + Sync>;
