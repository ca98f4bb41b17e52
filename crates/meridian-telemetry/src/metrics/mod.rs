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

//! Meters, their instruments, and the registry that collects them.
//!
//! A [`MeterFactory`] is built once through a [`MeterBuilder`]. It owns the
//! processor chain, every [`Meter`] handed out, the collectors, and the
//! background worker that runs the collection cycle.

mod builder;
mod instruments;
mod meter;
mod registry;

pub use self::builder::MeterBuilder;
pub use self::instruments::{Counter, Gauge};
pub use self::meter::Meter;
pub use self::registry::{CycleStats, MeterFactory};
