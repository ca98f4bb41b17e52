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

//! Named event sources and the machinery to discover and subscribe to them.
//!
//! Any component can announce itself as a named [`EventSource`] in an
//! [`EventSourceRegistry`]. Listeners never need to know the producer: they
//! observe the registry's stream of created sources, pick the ones they care
//! about and attach an [`EventListener`] with an optional per-event
//! enablement predicate.
//!
//! The [`SubscriptionManager`] packages that pattern: source selection,
//! per-source handler construction, routing of start/stop/exception/custom
//! events to a [`ListenerHandler`] and an idempotent, thread-safe teardown.

mod handler;
mod registry;
mod source;
mod subscriber;
mod types;

pub use self::handler::{EventKind, HandlerRouter, ListenerHandler};
pub use self::registry::{EventSourceRegistry, SourceObserver, SourceStreamSubscription};
pub use self::source::{EventListener, EventSource, IsEnabled, Subscription};
pub use self::subscriber::{SourceFilter, SubscriptionManager};
pub use self::types::{Activity, Event, EventLevel, EventPayload, EventValue};
