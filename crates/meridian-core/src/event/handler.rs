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

//! Typed handlers for activity-style event sources.

use super::source::{EventListener, EventSource};
use super::types::{Activity, Event, EventPayload};
use crate::diagnostics::SdkEventSource;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Receives the events of one source, already split by kind.
///
/// Every callback has an empty default so handlers only implement what they
/// consume.
pub trait ListenerHandler: Send + Sync + 'static {
    /// Name of the source this handler is meant for.
    fn source_name(&self) -> &str;

    /// An activity started.
    fn on_start(&self, _activity: &Activity) {}

    /// An activity stopped.
    fn on_stop(&self, _activity: &Activity) {}

    /// An activity failed.
    fn on_exception(&self, _activity: Option<&Activity>, _message: &str) {}

    /// Any other event.
    fn on_custom(&self, _name: &str, _payload: &EventPayload) {}
}

/// The routing decision for an event name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `*.Start`
    Start,
    /// `*.Stop`
    Stop,
    /// `*.Exception`
    Exception,
    /// Anything else.
    Custom,
}

impl EventKind {
    /// Classifies an event by its name suffix.
    pub fn of(name: &str) -> Self {
        if name.ends_with(".Start") {
            EventKind::Start
        } else if name.ends_with(".Stop") {
            EventKind::Stop
        } else if name.ends_with(".Exception") {
            EventKind::Exception
        } else {
            EventKind::Custom
        }
    }
}

/// Adapts a [`ListenerHandler`] to the raw [`EventListener`] contract.
///
/// A handler that panics never unwinds into the source: the failure is
/// swallowed here and reported through the SDK diagnostics source, and the
/// subscription stays in place.
pub struct HandlerRouter {
    handler: Arc<dyn ListenerHandler>,
}

impl HandlerRouter {
    /// Wraps a handler.
    pub fn new(handler: Arc<dyn ListenerHandler>) -> Self {
        Self { handler }
    }

    /// The wrapped handler.
    pub fn handler(&self) -> &Arc<dyn ListenerHandler> {
        &self.handler
    }

    fn route(&self, event: &Event) {
        match (EventKind::of(&event.name), &event.payload) {
            (EventKind::Start, EventPayload::Activity(activity)) => self.handler.on_start(activity),
            (EventKind::Stop, EventPayload::Activity(activity)) => self.handler.on_stop(activity),
            (EventKind::Exception, EventPayload::Error { activity, message }) => {
                self.handler.on_exception(activity.as_ref(), message)
            }
            (EventKind::Custom, payload) => self.handler.on_custom(&event.name, payload),
            (kind, _) => {
                log::trace!(
                    "Ignoring {:?} event '{}' with an unexpected payload shape",
                    kind,
                    event.name
                );
            }
        }
    }
}

impl EventListener for HandlerRouter {
    fn on_event(&self, source: &EventSource, event: &Event) {
        if panic::catch_unwind(AssertUnwindSafe(|| self.route(event))).is_err() {
            log::warn!(
                "Handler for '{}' panicked on event '{}'",
                self.handler.source_name(),
                event.name
            );
            let sdk = SdkEventSource::global();
            if !source.ptr_eq(sdk.source()) {
                sdk.handler_failed(source.name(), &event.name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{EventLevel, EventSourceRegistry};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Journal {
        calls: Mutex<Vec<String>>,
    }

    impl ListenerHandler for Journal {
        fn source_name(&self) -> &str {
            "Test.Source"
        }

        fn on_start(&self, activity: &Activity) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("start:{}", activity.operation));
        }

        fn on_stop(&self, activity: &Activity) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("stop:{:?}", activity.duration));
        }

        fn on_exception(&self, _activity: Option<&Activity>, message: &str) {
            self.calls.lock().unwrap().push(format!("error:{message}"));
        }

        fn on_custom(&self, name: &str, _payload: &EventPayload) {
            self.calls.lock().unwrap().push(format!("custom:{name}"));
        }
    }

    #[test]
    fn test_event_kind_classification() {
        assert_eq!(EventKind::of("Http.Start"), EventKind::Start);
        assert_eq!(EventKind::of("Http.Stop"), EventKind::Stop);
        assert_eq!(EventKind::of("Http.Exception"), EventKind::Exception);
        assert_eq!(EventKind::of("Http.BeforeAction"), EventKind::Custom);
    }

    #[test]
    fn test_router_dispatches_by_kind() {
        let registry = EventSourceRegistry::new();
        let source = registry.create_source("Test.Source");
        let journal = Arc::new(Journal::default());
        let _sub = source.subscribe(Arc::new(HandlerRouter::new(journal.clone())), None);

        let activity = Activity::start("Op");
        source.write(&Event::activity_start(activity.clone()));
        source.write(&Event::activity_stop(
            activity.clone().stopped(Duration::from_millis(5)),
        ));
        source.write(&Event::activity_exception(activity, "boom"));
        source.write(&Event::new("Op.Custom", EventLevel::Verbose));

        assert_eq!(
            *journal.calls.lock().unwrap(),
            vec![
                "start:Op".to_string(),
                "stop:Some(5ms)".to_string(),
                "error:boom".to_string(),
                "custom:Op.Custom".to_string(),
            ]
        );
    }

    #[test]
    fn test_mismatched_payload_is_ignored() {
        let registry = EventSourceRegistry::new();
        let source = registry.create_source("Test.Source");
        let journal = Arc::new(Journal::default());
        let _sub = source.subscribe(Arc::new(HandlerRouter::new(journal.clone())), None);

        source.write(&Event::new("Op.Start", EventLevel::Informational));

        assert!(journal.calls.lock().unwrap().is_empty());
    }
}
