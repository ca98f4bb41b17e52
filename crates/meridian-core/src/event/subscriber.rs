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

//! Attaches listeners to matching event sources as they appear.

use super::handler::{HandlerRouter, ListenerHandler};
use super::registry::{EventSourceRegistry, SourceObserver, SourceStreamSubscription};
use super::source::{EventListener, EventSource, IsEnabled, Subscription};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Selects the sources a manager attaches to.
pub type SourceFilter = Box<dyn Fn(&EventSource) -> bool + Send + Sync>;

type ListenerFactory = Box<dyn Fn(&EventSource) -> Option<Arc<dyn EventListener>> + Send + Sync>;

struct ManagerInner {
    registry: Arc<EventSourceRegistry>,
    source_filter: SourceFilter,
    listener_factory: ListenerFactory,
    is_enabled: Option<IsEnabled>,
    disposed: AtomicBool,
    subscriptions: Mutex<Vec<Subscription>>,
    all_sources: Mutex<Option<SourceStreamSubscription>>,
}

impl ManagerInner {
    fn attach(&self, source: &EventSource, listener: Arc<dyn EventListener>) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }

        let subscription = source.subscribe(listener, self.is_enabled.clone());
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Re-checked under the lock: a dispose that raced past the first check
        // has either drained the list already or will drain it after us.
        if self.disposed.load(Ordering::Acquire) {
            drop(subscriptions);
            subscription.dispose();
            return false;
        }
        subscriptions.push(subscription);
        log::debug!("Subscribed to event source '{}'", source.name());
        true
    }
}

impl SourceObserver for ManagerInner {
    fn on_source_created(&self, source: &EventSource) {
        if self.disposed.load(Ordering::Acquire) || !(self.source_filter)(source) {
            return;
        }
        if let Some(listener) = (self.listener_factory)(source) {
            self.attach(source, listener);
        }
    }
}

/// Watches a registry for newly created event sources and subscribes a
/// listener to every source that passes the filter.
///
/// The manager keeps every subscription it made and releases them all on
/// [`dispose`](SubscriptionManager::dispose), which is idempotent and safe to
/// call from several threads: exactly one caller performs the teardown.
/// Dropping the manager disposes it.
pub struct SubscriptionManager {
    inner: Arc<ManagerInner>,
}

impl SubscriptionManager {
    /// Subscribes one fixed handler to every source named
    /// `handler.source_name()`.
    pub fn for_handler(
        registry: Arc<EventSourceRegistry>,
        handler: Arc<dyn ListenerHandler>,
        is_enabled: Option<IsEnabled>,
    ) -> Self {
        let source_name = handler.source_name().to_string();
        Self::with_factory(
            registry,
            move |_| handler.clone(),
            move |source| source.name() == source_name,
            is_enabled,
        )
    }

    /// Builds a handler per accepted source with `factory`, keyed by the
    /// source name.
    pub fn with_factory<F, P>(
        registry: Arc<EventSourceRegistry>,
        factory: F,
        filter: P,
        is_enabled: Option<IsEnabled>,
    ) -> Self
    where
        F: Fn(&str) -> Arc<dyn ListenerHandler> + Send + Sync + 'static,
        P: Fn(&EventSource) -> bool + Send + Sync + 'static,
    {
        Self::with_listener_factory(
            registry,
            move |source| {
                let router: Arc<dyn EventListener> =
                    Arc::new(HandlerRouter::new(factory(source.name())));
                Some(router)
            },
            filter,
            is_enabled,
        )
    }

    /// The general form: `factory` returns the raw listener to attach, or
    /// `None` to skip the source for now (it can be attached later with
    /// [`attach`](Self::attach)).
    pub fn with_listener_factory<F, P>(
        registry: Arc<EventSourceRegistry>,
        factory: F,
        filter: P,
        is_enabled: Option<IsEnabled>,
    ) -> Self
    where
        F: Fn(&EventSource) -> Option<Arc<dyn EventListener>> + Send + Sync + 'static,
        P: Fn(&EventSource) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(ManagerInner {
                registry,
                source_filter: Box::new(filter),
                listener_factory: Box::new(factory),
                is_enabled,
                disposed: AtomicBool::new(false),
                subscriptions: Mutex::new(Vec::new()),
                all_sources: Mutex::new(None),
            }),
        }
    }

    /// Starts watching the registry. Sources that already exist are
    /// considered immediately. Calling it again has no effect.
    pub fn subscribe(&self) {
        let mut all_sources = self
            .inner
            .all_sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if all_sources.is_some() || self.inner.disposed.load(Ordering::Acquire) {
            return;
        }
        let observer: Arc<dyn SourceObserver> = self.inner.clone();
        *all_sources = Some(self.inner.registry.subscribe_sources(observer));
    }

    /// Subscribes `listener` to `source` and tracks the subscription.
    /// Returns `false` (and subscribes nothing) once the manager is disposed.
    pub fn attach(&self, source: &EventSource, listener: Arc<dyn EventListener>) -> bool {
        self.inner.attach(source, listener)
    }

    /// Tears down every subscription and stops watching the registry.
    ///
    /// Returns `true` for the single call that performed the teardown.
    pub fn dispose(&self) -> bool {
        if self
            .inner
            .disposed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }

        let drained: Vec<Subscription> = {
            let mut subscriptions = self
                .inner
                .subscriptions
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscriptions.drain(..).collect()
        };
        let count = drained.len();
        for subscription in drained {
            subscription.dispose();
        }

        if let Some(all_sources) = self
            .inner
            .all_sources
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            all_sources.dispose();
        }

        log::debug!("Subscription manager disposed ({} subscriptions).", count);
        true
    }

    /// Returns `true` once disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("subscriptions", &self.subscription_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
