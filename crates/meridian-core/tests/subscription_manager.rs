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

use meridian_core::event::{
    Activity, Event, EventPayload, EventSource, EventSourceRegistry, ListenerHandler,
    SubscriptionManager,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Default)]
struct Stats {
    built: AtomicUsize,
    dropped: AtomicUsize,
    stops: AtomicUsize,
    custom: Mutex<Vec<String>>,
}

struct TrackedHandler {
    name: String,
    stats: Arc<Stats>,
}

impl ListenerHandler for TrackedHandler {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn on_stop(&self, _activity: &Activity) {
        self.stats.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn on_custom(&self, name: &str, _payload: &EventPayload) {
        self.stats.custom.lock().unwrap().push(name.to_string());
    }
}

impl Drop for TrackedHandler {
    fn drop(&mut self) {
        self.stats.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

fn tracking_manager(
    registry: Arc<EventSourceRegistry>,
    stats: Arc<Stats>,
    predicate: impl Fn(&EventSource) -> bool + Send + Sync + 'static,
) -> SubscriptionManager {
    SubscriptionManager::with_factory(
        registry,
        move |name| {
            stats.built.fetch_add(1, Ordering::SeqCst);
            Arc::new(TrackedHandler {
                name: name.to_string(),
                stats: stats.clone(),
            })
        },
        predicate,
        None,
    )
}

#[test]
fn handler_is_built_once_for_matching_source_only() {
    let _ = env_logger::builder().is_test(true).try_init();
    let registry = EventSourceRegistry::new();
    let stats = Arc::new(Stats::default());
    let manager = tracking_manager(registry.clone(), stats.clone(), |source| {
        source.name() == "Test.Source"
    });
    manager.subscribe();

    let test_source = registry.create_source("Test.Source");
    assert_eq!(stats.built.load(Ordering::SeqCst), 1);

    let _other = registry.create_source("Other.Source");
    assert_eq!(stats.built.load(Ordering::SeqCst), 1);

    test_source.write(&Event::activity_stop(
        Activity::start("Request").stopped(Duration::from_millis(3)),
    ));
    test_source.write(&Event::new(
        "Request.Redirect",
        meridian_core::EventLevel::Verbose,
    ));

    assert_eq!(stats.stops.load(Ordering::SeqCst), 1);
    assert_eq!(
        *stats.custom.lock().unwrap(),
        vec!["Request.Redirect".to_string()]
    );
}

#[test]
fn sources_created_before_subscribe_are_picked_up() {
    let registry = EventSourceRegistry::new();
    let early = registry.create_source("Test.Source");
    let stats = Arc::new(Stats::default());
    let manager = tracking_manager(registry.clone(), stats.clone(), |_| true);

    assert_eq!(early.listener_count(), 0);
    manager.subscribe();
    assert_eq!(early.listener_count(), 1);
    assert_eq!(manager.subscription_count(), 1);
}

#[test]
fn concurrent_dispose_tears_down_exactly_once() {
    const SOURCES: usize = 8;
    const THREADS: usize = 8;

    let registry = EventSourceRegistry::new();
    let stats = Arc::new(Stats::default());
    let manager = Arc::new(tracking_manager(registry.clone(), stats.clone(), |_| true));
    manager.subscribe();

    let sources: Vec<EventSource> = (0..SOURCES)
        .map(|i| registry.create_source(format!("Source.{i}")))
        .collect();
    assert_eq!(stats.built.load(Ordering::SeqCst), SOURCES);
    assert_eq!(manager.subscription_count(), SOURCES);

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let manager = manager.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                manager.dispose()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|performed| *performed)
        .count();

    assert_eq!(winners, 1);
    assert!(manager.is_disposed());
    assert_eq!(manager.subscription_count(), 0);
    assert_eq!(stats.dropped.load(Ordering::SeqCst), SOURCES);
    assert!(sources.iter().all(|s| s.listener_count() == 0));
    assert_eq!(registry.observer_count(), 0);
}

#[test]
fn panicking_handler_does_not_reach_the_producer() {
    struct Exploding;

    impl ListenerHandler for Exploding {
        fn source_name(&self) -> &str {
            "Test.Source"
        }

        fn on_stop(&self, _activity: &Activity) {
            panic!("handler failure");
        }
    }

    let registry = EventSourceRegistry::new();
    let manager = SubscriptionManager::for_handler(registry.clone(), Arc::new(Exploding), None);
    manager.subscribe();

    let source = registry.create_source("Test.Source");
    source.write(&Event::activity_stop(Activity::start("Op")));
    source.write(&Event::activity_stop(Activity::start("Op")));

    assert_eq!(source.listener_count(), 1);
    assert!(!manager.is_disposed());
}

#[test]
fn dropping_the_manager_disposes_it() {
    let registry = EventSourceRegistry::new();
    let stats = Arc::new(Stats::default());
    let source = registry.create_source("Test.Source");
    {
        let manager = tracking_manager(registry.clone(), stats.clone(), |_| true);
        manager.subscribe();
        assert_eq!(source.listener_count(), 1);
    }
    assert_eq!(source.listener_count(), 0);
    assert_eq!(stats.dropped.load(Ordering::SeqCst), 1);
}
