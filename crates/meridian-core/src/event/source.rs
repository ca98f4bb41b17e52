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

use super::types::{Event, EventLevel};
use crate::diagnostics::SdkEventSource;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

/// Receives the events written to a source it subscribed to.
pub trait EventListener: Send + Sync + 'static {
    /// Called synchronously on the thread that wrote the event.
    fn on_event(&self, source: &EventSource, event: &Event);
}

/// Per-event enablement predicate: `(event name, level) -> enabled`.
pub type IsEnabled = Arc<dyn Fn(&str, EventLevel) -> bool + Send + Sync>;

struct ListenerEntry {
    id: u64,
    listener: Arc<dyn EventListener>,
    is_enabled: Option<IsEnabled>,
}

impl ListenerEntry {
    fn accepts(&self, name: &str, level: EventLevel) -> bool {
        self.is_enabled
            .as_ref()
            .map_or(true, |is_enabled| is_enabled(name, level))
    }
}

pub(crate) struct SourceInner {
    name: String,
    next_listener_id: AtomicU64,
    listeners: RwLock<Vec<Arc<ListenerEntry>>>,
}

/// A named, independently owned producer of events.
///
/// Sources are created through an
/// [`EventSourceRegistry`](super::EventSourceRegistry) so that listeners can
/// discover them. Cloning an `EventSource` yields another handle to the same
/// source.
#[derive(Clone)]
pub struct EventSource {
    inner: Arc<SourceInner>,
}

impl EventSource {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(SourceInner {
                name: name.into(),
                next_listener_id: AtomicU64::new(1),
                listeners: RwLock::new(Vec::new()),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<SourceInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<SourceInner> {
        Arc::downgrade(&self.inner)
    }

    /// The source name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Returns `true` if at least one listener wants an event with this name
    /// and level. Producers check this before building a payload.
    pub fn is_enabled(&self, name: &str, level: EventLevel) -> bool {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry.accepts(name, level))
    }

    /// Number of active subscriptions.
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Delivers `event` to every listener whose predicate accepts it.
    ///
    /// A panicking listener is isolated: the remaining listeners still receive
    /// the event and the failure is reported through the SDK diagnostics
    /// source.
    pub fn write(&self, event: &Event) {
        let snapshot: Vec<Arc<ListenerEntry>> = {
            let listeners = self
                .inner
                .listeners
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            listeners
                .iter()
                .filter(|entry| entry.accepts(&event.name, event.level))
                .cloned()
                .collect()
        };

        for entry in snapshot {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                entry.listener.on_event(self, event);
            }));
            if outcome.is_err() {
                log::warn!(
                    "Listener on source '{}' panicked while handling '{}'",
                    self.name(),
                    event.name
                );
                // The SDK's own source reporting its own listener failure
                // would recurse.
                if !self.ptr_eq(SdkEventSource::global().source()) {
                    SdkEventSource::global().handler_failed(self.name(), &event.name);
                }
            }
        }
    }

    /// Attaches a listener. The returned [`Subscription`] detaches it when
    /// disposed or dropped.
    pub fn subscribe(
        &self,
        listener: Arc<dyn EventListener>,
        is_enabled: Option<IsEnabled>,
    ) -> Subscription {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(ListenerEntry {
                id,
                listener,
                is_enabled,
            }));
        log::trace!("Listener {} subscribed to source '{}'", id, self.name());

        Subscription {
            source: self.downgrade(),
            listener_id: id,
            disposed: AtomicBool::new(false),
        }
    }

    /// Returns `true` if both handles refer to the same source.
    pub fn ptr_eq(&self, other: &EventSource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSource")
            .field("name", &self.inner.name)
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// An active listen registration on one source.
///
/// Dropping the subscription disposes it.
pub struct Subscription {
    source: Weak<SourceInner>,
    listener_id: u64,
    disposed: AtomicBool,
}

impl Subscription {
    /// Detaches the listener. Returns `true` only for the call that actually
    /// performed the detach.
    pub fn dispose(&self) -> bool {
        if self
            .disposed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        if let Some(source) = self.source.upgrade() {
            source
                .listeners
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .retain(|entry| entry.id != self.listener_id);
            log::trace!(
                "Listener {} unsubscribed from source '{}'",
                self.listener_id,
                source.name
            );
        }
        true
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("listener_id", &self.listener_id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
