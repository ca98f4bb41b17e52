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

//! The listener that writes SDK events into the circular log.

use crate::circular::CircularLog;
use crate::config::SelfDiagnosticsConfig;
use crate::encoder::{format_record, format_timestamp, BUFFER_SIZE};
use crate::error::DiagnosticsError;
use crate::store::MmapLogStore;
use chrono::Utc;
use meridian_core::event::{
    Event, EventListener, EventPayload, EventSource, EventSourceRegistry, EventValue,
    SubscriptionManager,
};
use meridian_core::{EventLevel, EVENT_SOURCE_PREFIX};
use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

thread_local! {
    static WRITE_BUFFER: RefCell<Vec<u8>> = const { RefCell::new(Vec::new()) };
}

struct ListenerState {
    level: EventLevel,
    log: CircularLog,
    // `Some` while buffering: sources seen before activation wait here.
    pending: Mutex<Option<Vec<EventSource>>>,
}

impl ListenerState {
    fn listener_for(self: &Arc<Self>, source: &EventSource) -> Option<Arc<dyn EventListener>> {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        match pending.as_mut() {
            Some(queue) => {
                log::trace!("Queued diagnostics source '{}'", source.name());
                queue.push(source.clone());
                None
            }
            None => Some(self.clone()),
        }
    }

    fn write_event(&self, message: &str, params: &[EventValue]) {
        let timestamp = format_timestamp(Utc::now());
        // Thread teardown or a re-entrant write: drop the record.
        let _ = WRITE_BUFFER.try_with(|cell| {
            let Ok(mut buffer) = cell.try_borrow_mut() else {
                return;
            };
            if buffer.len() != BUFFER_SIZE {
                buffer.resize(BUFFER_SIZE, 0);
            }
            let len = format_record(&timestamp, message, params, &mut buffer);
            let _ = self.log.write(&buffer[..len]);
        });
    }
}

impl EventListener for ListenerState {
    fn on_event(&self, _source: &EventSource, event: &Event) {
        let message = event.message.as_deref().unwrap_or(event.name.as_ref());
        match &event.payload {
            EventPayload::Values(values) => self.write_event(message, values),
            EventPayload::Error { message: error, .. } => {
                self.write_event(message, &[EventValue::from(error.clone())])
            }
            EventPayload::None | EventPayload::Activity(_) => self.write_event(message, &[]),
        }
    }
}

/// Captures events from every `Meridian-` source into a [`CircularLog`].
///
/// The listener starts out buffering: matching sources are only queued.
/// [`activate`](Self::activate) subscribes to the queued sources and to
/// every later one, at the configured level.
pub struct SelfDiagnosticsListener {
    state: Arc<ListenerState>,
    manager: SubscriptionManager,
}

impl SelfDiagnosticsListener {
    /// Starts watching `registry`, buffering matching sources until
    /// [`activate`](Self::activate).
    pub fn new(registry: Arc<EventSourceRegistry>, level: EventLevel, log: CircularLog) -> Self {
        let state = Arc::new(ListenerState {
            level,
            log,
            pending: Mutex::new(Some(Vec::new())),
        });

        let factory_state = state.clone();
        let manager = SubscriptionManager::with_listener_factory(
            registry,
            move |source| factory_state.listener_for(source),
            |source| source.name().starts_with(EVENT_SOURCE_PREFIX),
            Some(Arc::new(move |_: &str, event_level: EventLevel| {
                level.allows(event_level)
            })),
        );
        manager.subscribe();

        Self { state, manager }
    }

    /// Leaves the buffering state: queued sources are subscribed now, later
    /// ones as they are created. Calling it again has no effect.
    pub fn activate(&self) {
        let queued = self
            .state
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(queued) = queued else {
            return;
        };

        let listener: Arc<dyn EventListener> = self.state.clone();
        for source in &queued {
            self.manager.attach(source, listener.clone());
        }
        log::debug!(
            "Self-diagnostics active at level {} ({} queued sources).",
            self.state.level.name(),
            queued.len()
        );
    }

    /// Returns `true` between [`activate`](Self::activate) and
    /// [`dispose`](Self::dispose).
    pub fn is_active(&self) -> bool {
        !self.manager.is_disposed()
            && self
                .state
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_none()
    }

    /// The level the listener subscribes at.
    pub fn level(&self) -> EventLevel {
        self.state.level
    }

    /// The log the listener writes to.
    pub fn log(&self) -> &CircularLog {
        &self.state.log
    }

    /// Encodes one record and appends it to the log. Failures are discarded.
    pub fn write_event(&self, message: &str, params: &[EventValue]) {
        self.state.write_event(message, params);
    }

    /// Unsubscribes from every source and releases the log store. Returns
    /// `true` for the call that performed the teardown.
    pub fn dispose(&self) -> bool {
        if !self.manager.dispose() {
            return false;
        }
        self.state
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.state.log.close();
        log::debug!("Self-diagnostics listener disposed.");
        true
    }
}

impl Drop for SelfDiagnosticsListener {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for SelfDiagnosticsListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelfDiagnosticsListener")
            .field("level", &self.state.level)
            .field("log", &self.state.log)
            .field("manager", &self.manager)
            .finish()
    }
}

/// A file-backed self-diagnostics setup built from configuration.
#[derive(Debug)]
pub struct SelfDiagnostics {
    listener: SelfDiagnosticsListener,
    path: PathBuf,
}

impl SelfDiagnostics {
    /// Creates `<process>.<pid>.log` in the configured directory, maps it
    /// and starts an active listener on `registry`.
    pub fn from_config(
        config: &SelfDiagnosticsConfig,
        registry: Arc<EventSourceRegistry>,
    ) -> Result<Self, DiagnosticsError> {
        let level = config.level()?;
        std::fs::create_dir_all(&config.log_directory)?;
        let path = config.log_directory.join(log_file_name());

        let store = MmapLogStore::create(&path, config.log_file_size())?;
        let log = CircularLog::new(Box::new(store))?;
        let listener = SelfDiagnosticsListener::new(registry, level, log);
        listener.activate();

        log::info!(
            "Self-diagnostics writing to '{}' at level {}.",
            path.display(),
            level.name()
        );
        Ok(Self { listener, path })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying listener.
    pub fn listener(&self) -> &SelfDiagnosticsListener {
        &self.listener
    }

    /// Stops capturing and releases the log file.
    pub fn dispose(&self) -> bool {
        self.listener.dispose()
    }
}

/// `<process>.<pid>.log`
pub fn log_file_name() -> String {
    let process = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|s| s.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "meridian".to_string());
    format!("{}.{}.log", process, std::process::id())
}
