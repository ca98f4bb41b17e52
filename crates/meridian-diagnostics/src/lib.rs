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

//! # Meridian Diagnostics
//!
//! Captures the SDK's own diagnostic events (every event source whose name
//! starts with [`meridian_core::EVENT_SOURCE_PREFIX`]) into a fixed-size
//! circular log, usually a memory-mapped file, so failures inside the
//! telemetry stack can be inspected without a logging backend.

#![warn(missing_docs)]

pub mod circular;
pub mod config;
pub mod encoder;
pub mod error;
pub mod listener;
pub mod store;

pub use circular::{CircularLog, Reservation};
pub use config::SelfDiagnosticsConfig;
pub use encoder::{encode_in_buffer, format_record, format_timestamp, BUFFER_SIZE};
pub use error::DiagnosticsError;
pub use listener::{SelfDiagnostics, SelfDiagnosticsListener};
pub use store::{LogStore, MemoryLogStore, MmapLogStore};
