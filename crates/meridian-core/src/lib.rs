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

//! # Meridian Core
//!
//! Foundational crate containing the metric contracts shared by every stage of
//! the processing pipeline, the named event-source substrate that collectors
//! and the self-diagnostics listener subscribe to, and the SDK's own
//! diagnostics event source.

#![warn(missing_docs)]

pub mod diagnostics;
pub mod event;
pub mod telemetry;

pub use diagnostics::{SdkEventSource, EVENT_SOURCE_PREFIX, METRICS_SOURCE_NAME};
pub use event::{
    Event, EventLevel, EventPayload, EventSource, EventSourceRegistry, Subscription,
    SubscriptionManager,
};
