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

//! # Meridian Telemetry
//!
//! The metrics runtime: meters and their instruments, the [`MeterFactory`]
//! registry with its background collection worker, the processor pipeline
//! every checkpointed value flows through, collectors that turn event-source
//! activity into measurements, and the [`TelemetryService`] that hosts it all.

#![warn(missing_docs)]

pub mod collectors;
pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod scheduler;
pub mod service;

pub use collectors::{ActivityCollector, Collector, CollectorFactory};
pub use config::TelemetryConfig;
pub use error::ConfigError;
pub use metrics::{Counter, CycleStats, Gauge, Meter, MeterBuilder, MeterFactory};
pub use pipeline::{
    InMemoryExporter, NoOpProcessor, ProcessorPipelineBuilder, TransformProcessor,
    UngroupedBatcher,
};
pub use scheduler::{CollectionWorker, WorkerExit};
pub use service::TelemetryService;
