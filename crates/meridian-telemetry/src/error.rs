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

//! Configuration-time errors.

use meridian_core::telemetry::MetricsError;
use meridian_diagnostics::DiagnosticsError;
use thiserror::Error;

/// Errors reported while building or starting the telemetry runtime.
///
/// These are the only errors that reach the caller; everything that goes
/// wrong once collection runs is contained and reported as a diagnostic.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Collectors were configured but there is nowhere to send their data.
    #[error("collectors are configured but no processor pipeline was added")]
    MissingPipeline,
    /// Only one processing pipeline is supported.
    #[error("{0} processor pipelines were added, only one is supported")]
    MultiplePipelines(usize),
    /// The collection interval must be positive.
    #[error("the collection interval must be greater than zero")]
    InvalidInterval,
    /// A collector factory failed.
    #[error("collector '{name}' could not be created: {source}")]
    Collector {
        /// Name the collector was registered under.
        name: String,
        /// What went wrong.
        #[source]
        source: MetricsError,
    },
    /// The collection worker thread could not be spawned.
    #[error("failed to spawn the collection worker: {0}")]
    Worker(#[source] std::io::Error),
    /// Reading a configuration file failed.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
    /// A configuration file is not valid JSON for the expected shape.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// Self-diagnostics could not be set up.
    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),
}
