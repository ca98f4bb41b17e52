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

//! Error types for self-diagnostics.

use thiserror::Error;

/// Errors raised while setting up self-diagnostics.
///
/// Once the listener runs, write failures are swallowed and never surface.
#[derive(Error, Debug)]
pub enum DiagnosticsError {
    /// Creating or mapping the log file failed.
    #[error("diagnostics I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid JSON for the expected shape.
    #[error("invalid diagnostics configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A log store cannot have this capacity.
    #[error("invalid log capacity: {0} bytes")]
    InvalidCapacity(usize),
    /// The configured level name is unknown.
    #[error("unknown event level '{0}'")]
    InvalidLevel(String),
}
