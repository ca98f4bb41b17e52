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

//! Provides the foundational traits and data structures for metric telemetry.
//!
//! This module defines the "common language" spoken along the processing
//! pipeline: what an aggregated update looks like ([`MetricRecord`]), how a
//! stage consumes it ([`MetricProcessor`]) and how the terminal sink is
//! reached ([`MetricExporter`]).
//!
//! `meridian-telemetry` owns the meters that produce records and the concrete
//! stages that route them; this module only fixes the contracts.

pub mod metrics;
pub mod processor;

pub use self::metrics::{
    LabelSet, MetricId, MetricRecord, MetricType, MetricValue, MetricsError, MetricsResult,
};
pub use self::processor::{ExportResult, MetricExporter, MetricProcessor};
