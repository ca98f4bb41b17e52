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

//! The SDK's own event source.
//!
//! Internal failures that must never reach the host application (a meter
//! panicking during collection, an exporter rejecting a batch, the collection
//! worker dying) are written here. The self-diagnostics listener picks up
//! every source whose name starts with [`EVENT_SOURCE_PREFIX`].

use crate::event::{Event, EventLevel, EventPayload, EventSource, EventSourceRegistry, EventValue};
use std::borrow::Cow;
use std::sync::OnceLock;
use std::time::Duration;

/// Name prefix reserved for the SDK's internal sources.
pub const EVENT_SOURCE_PREFIX: &str = "Meridian-";

/// Name of the source the metrics SDK reports through.
pub const METRICS_SOURCE_NAME: &str = "Meridian-Metrics";

/// Typed writer over the SDK diagnostics source.
#[derive(Debug, Clone)]
pub struct SdkEventSource {
    source: EventSource,
}

impl SdkEventSource {
    /// Registers a new diagnostics source on `registry`.
    pub fn new(registry: &EventSourceRegistry, name: impl Into<String>) -> Self {
        Self {
            source: registry.create_source(name),
        }
    }

    /// The `Meridian-Metrics` source on the process-wide registry.
    pub fn global() -> &'static SdkEventSource {
        static GLOBAL: OnceLock<SdkEventSource> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            SdkEventSource::new(&EventSourceRegistry::global(), METRICS_SOURCE_NAME)
        })
    }

    /// The underlying event source.
    pub fn source(&self) -> &EventSource {
        &self.source
    }

    /// The source name.
    pub fn name(&self) -> &str {
        self.source.name()
    }

    fn emit(
        &self,
        name: &'static str,
        level: EventLevel,
        message: &'static str,
        values: Vec<EventValue>,
    ) {
        self.source.write(
            &Event::new(name, level)
                .with_message(Cow::Borrowed(message))
                .with_payload(EventPayload::Values(values)),
        );
    }

    /// A meter failed during a collection cycle.
    pub fn collection_failed(&self, meter: &str, error: &str) {
        if self.source.is_enabled("CollectionFailed", EventLevel::Error) {
            self.emit(
                "CollectionFailed",
                EventLevel::Error,
                "Failed to collect meter",
                vec![meter.to_string().into(), error.to_string().into()],
            );
        }
    }

    /// The exporter rejected a batch.
    pub fn export_failed(&self, records: usize, retryable: bool) {
        if self.source.is_enabled("ExportFailed", EventLevel::Error) {
            self.emit(
                "ExportFailed",
                EventLevel::Error,
                "Exporter rejected a batch",
                vec![(records as u64).into(), retryable.into()],
            );
        }
    }

    /// The collection worker started.
    pub fn worker_started(&self, interval: Duration) {
        if self
            .source
            .is_enabled("WorkerStarted", EventLevel::Informational)
        {
            self.emit(
                "WorkerStarted",
                EventLevel::Informational,
                "Collection worker started, interval (ms)",
                vec![(interval.as_millis() as u64).into()],
            );
        }
    }

    /// The collection worker stopped after a cancellation request.
    pub fn worker_stopped(&self, cycles: u64) {
        if self
            .source
            .is_enabled("WorkerStopped", EventLevel::Informational)
        {
            self.emit(
                "WorkerStopped",
                EventLevel::Informational,
                "Collection worker stopped after cycles",
                vec![cycles.into()],
            );
        }
    }

    /// The collection worker died.
    pub fn worker_terminated(&self, reason: &str) {
        if self
            .source
            .is_enabled("WorkerTerminated", EventLevel::Critical)
        {
            self.emit(
                "WorkerTerminated",
                EventLevel::Critical,
                "Collection worker terminated unexpectedly",
                vec![reason.to_string().into()],
            );
        }
    }

    /// A listener panicked while handling an event.
    pub fn handler_failed(&self, source: &str, event: &str) {
        if self.source.is_enabled("HandlerFailed", EventLevel::Warning) {
            self.emit(
                "HandlerFailed",
                EventLevel::Warning,
                "Listener failed while handling event",
                vec![source.to_string().into(), event.to_string().into()],
            );
        }
    }

    /// A source observer panicked while a source was being announced.
    pub fn subscription_failed(&self, source: &str) {
        if self
            .source
            .is_enabled("SubscriptionFailed", EventLevel::Warning)
        {
            self.emit(
                "SubscriptionFailed",
                EventLevel::Warning,
                "Failed to subscribe to event source",
                vec![source.to_string().into()],
            );
        }
    }
}
