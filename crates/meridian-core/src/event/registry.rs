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

//! Registry of named event sources and the stream of their creation.

use super::source::{EventSource, SourceInner};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

/// Observes every source created in a registry.
pub trait SourceObserver: Send + Sync + 'static {
    /// Called once per source: for sources that already exist when the
    /// observer subscribes, then for every source created afterwards.
    fn on_source_created(&self, source: &EventSource);
}

struct RegistryState {
    sources: Vec<Weak<SourceInner>>,
    observers: Vec<(u64, Arc<dyn SourceObserver>)>,
    next_observer_id: u64,
}

impl RegistryState {
    fn live_sources(&mut self) -> Vec<EventSource> {
        self.sources.retain(|weak| weak.strong_count() > 0);
        self.sources
            .iter()
            .filter_map(Weak::upgrade)
            .map(EventSource::from_inner)
            .collect()
    }
}

/// A registry where producers announce named event sources and listeners
/// discover them.
///
/// The registry only keeps weak references to sources: a source disappears
/// once its producer drops the last handle. The process-wide instance is
/// reached through [`global`](EventSourceRegistry::global) and initialized on
/// first use; tests build isolated instances with
/// [`new`](EventSourceRegistry::new).
pub struct EventSourceRegistry {
    state: Mutex<RegistryState>,
}

impl EventSourceRegistry {
    /// Creates an isolated registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(RegistryState {
                sources: Vec::new(),
                observers: Vec::new(),
                next_observer_id: 1,
            }),
        })
    }

    /// The process-wide registry.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<EventSourceRegistry>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| {
                log::debug!("Process-wide event source registry initialized.");
                EventSourceRegistry::new()
            })
            .clone()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates and announces a new source.
    pub fn create_source(&self, name: impl Into<String>) -> EventSource {
        let source = EventSource::new(name);
        let observers: Vec<Arc<dyn SourceObserver>> = {
            let mut state = self.lock();
            state.sources.retain(|weak| weak.strong_count() > 0);
            state.sources.push(source.downgrade());
            state.observers.iter().map(|(_, o)| o.clone()).collect()
        };

        log::trace!(
            "Event source '{}' created ({} observers).",
            source.name(),
            observers.len()
        );
        for observer in &observers {
            notify(observer.as_ref(), &source);
        }
        source
    }

    /// Subscribes to the stream of created sources.
    ///
    /// The observer is first called for every live source, then for each
    /// source created later. A source is reported exactly once even when it
    /// is created concurrently with this call.
    pub fn subscribe_sources(
        self: &Arc<Self>,
        observer: Arc<dyn SourceObserver>,
    ) -> SourceStreamSubscription {
        let (id, existing) = {
            let mut state = self.lock();
            let id = state.next_observer_id;
            state.next_observer_id += 1;
            state.observers.push((id, observer.clone()));
            (id, state.live_sources())
        };

        for source in &existing {
            notify(observer.as_ref(), source);
        }

        SourceStreamSubscription {
            registry: Arc::downgrade(self),
            observer_id: id,
            disposed: AtomicBool::new(false),
        }
    }

    /// All live sources.
    pub fn sources(&self) -> Vec<EventSource> {
        self.lock().live_sources()
    }

    /// Number of live sources.
    pub fn source_count(&self) -> usize {
        self.lock().live_sources().len()
    }

    /// Number of subscribed observers.
    pub fn observer_count(&self) -> usize {
        self.lock().observers.len()
    }

    fn remove_observer(&self, id: u64) {
        let mut state = self.lock();
        state.observers.retain(|(observer_id, _)| *observer_id != id);
        if state.observers.is_empty() {
            // Last observer gone: nothing can be notified any more, drop the
            // bookkeeping for sources that died in the meantime.
            state.sources.retain(|weak| weak.strong_count() > 0);
            state.sources.shrink_to_fit();
        }
    }
}

impl fmt::Debug for EventSourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("EventSourceRegistry")
            .field("sources", &state.sources.len())
            .field("observers", &state.observers.len())
            .finish()
    }
}

fn notify(observer: &dyn SourceObserver, source: &EventSource) {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| observer.on_source_created(source)));
    if outcome.is_err() {
        log::warn!(
            "Source observer panicked while handling source '{}'",
            source.name()
        );
        crate::diagnostics::SdkEventSource::global().subscription_failed(source.name());
    }
}

/// Registration on a registry's stream of created sources.
///
/// Dropping it unsubscribes.
pub struct SourceStreamSubscription {
    registry: Weak<EventSourceRegistry>,
    observer_id: u64,
    disposed: AtomicBool,
}

impl SourceStreamSubscription {
    /// Stops receiving source notifications. Returns `true` for the call that
    /// performed the unsubscription.
    pub fn dispose(&self) -> bool {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.remove_observer(self.observer_id);
        }
        true
    }
}

impl Drop for SourceStreamSubscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for SourceStreamSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceStreamSubscription")
            .field("observer_id", &self.observer_id)
            .field("disposed", &self.disposed.load(Ordering::Acquire))
            .finish()
    }
}
