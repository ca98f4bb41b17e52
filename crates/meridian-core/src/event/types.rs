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

//! Event data carried from sources to listeners.

use crate::telemetry::LabelSet;
use std::borrow::Cow;
use std::fmt::{self, Display};
use std::time::{Duration, SystemTime};

/// Verbosity of an event. Lower values are more severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventLevel {
    /// Always delivered, regardless of the configured level.
    LogAlways = 0,
    /// Unrecoverable failure.
    Critical = 1,
    /// Failure that was contained.
    Error = 2,
    /// Degraded behaviour.
    Warning = 3,
    /// Lifecycle information.
    Informational = 4,
    /// Everything.
    Verbose = 5,
}

impl EventLevel {
    /// Parses a level name, ignoring ASCII case.
    pub fn from_name(name: &str) -> Option<Self> {
        let level = match name.to_ascii_lowercase().as_str() {
            "logalways" => EventLevel::LogAlways,
            "critical" => EventLevel::Critical,
            "error" => EventLevel::Error,
            "warning" => EventLevel::Warning,
            "informational" => EventLevel::Informational,
            "verbose" => EventLevel::Verbose,
            _ => return None,
        };
        Some(level)
    }

    /// Returns the canonical name of the level.
    pub fn name(self) -> &'static str {
        match self {
            EventLevel::LogAlways => "LogAlways",
            EventLevel::Critical => "Critical",
            EventLevel::Error => "Error",
            EventLevel::Warning => "Warning",
            EventLevel::Informational => "Informational",
            EventLevel::Verbose => "Verbose",
        }
    }

    /// Whether a listener configured at `self` receives an event at `level`.
    ///
    /// `LogAlways` as a listener level means "everything".
    pub fn allows(self, level: EventLevel) -> bool {
        self == EventLevel::LogAlways || level <= self
    }
}

/// A positional event parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum EventValue {
    /// Text.
    Str(Cow<'static, str>),
    /// Signed integer.
    I64(i64),
    /// Unsigned integer.
    U64(u64),
    /// Float.
    F64(f64),
    /// Boolean.
    Bool(bool),
    /// Missing value, rendered as `null`.
    Null,
}

impl Display for EventValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventValue::Str(s) => f.write_str(s),
            EventValue::I64(v) => write!(f, "{v}"),
            EventValue::U64(v) => write!(f, "{v}"),
            EventValue::F64(v) => write!(f, "{v}"),
            EventValue::Bool(v) => write!(f, "{v}"),
            EventValue::Null => f.write_str("null"),
        }
    }
}

impl From<&'static str> for EventValue {
    fn from(value: &'static str) -> Self {
        EventValue::Str(Cow::Borrowed(value))
    }
}

impl From<String> for EventValue {
    fn from(value: String) -> Self {
        EventValue::Str(Cow::Owned(value))
    }
}

impl From<i64> for EventValue {
    fn from(value: i64) -> Self {
        EventValue::I64(value)
    }
}

impl From<u64> for EventValue {
    fn from(value: u64) -> Self {
        EventValue::U64(value)
    }
}

impl From<f64> for EventValue {
    fn from(value: f64) -> Self {
        EventValue::F64(value)
    }
}

impl From<bool> for EventValue {
    fn from(value: bool) -> Self {
        EventValue::Bool(value)
    }
}

impl<T: Into<EventValue>> From<Option<T>> for EventValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(EventValue::Null, Into::into)
    }
}

/// A unit of work observed by a source (an incoming request, a job run...).
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    /// Operation name, e.g. "HttpRequestIn".
    pub operation: String,
    /// When the activity started.
    pub started_at: SystemTime,
    /// Set once the activity has stopped.
    pub duration: Option<Duration>,
    /// Dimensions describing the activity.
    pub tags: LabelSet,
}

impl Activity {
    /// Creates a running activity started now.
    pub fn start(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            started_at: SystemTime::now(),
            duration: None,
            tags: LabelSet::empty(),
        }
    }

    /// Attaches a tag.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags = self.tags.with_label(key, value);
        self
    }

    /// Marks the activity as stopped after `duration`.
    pub fn stopped(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

/// The typed payload shapes a source may attach to an event.
///
/// Listeners match on the shape they understand and ignore the rest.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventPayload {
    /// No payload.
    #[default]
    None,
    /// An activity lifecycle notification.
    Activity(Activity),
    /// A failure, optionally tied to the activity it interrupted.
    Error {
        /// The activity that failed, if any.
        activity: Option<Activity>,
        /// Human readable failure.
        message: String,
    },
    /// Positional parameters, as used by the SDK's own diagnostics events.
    Values(Vec<EventValue>),
}

/// A single event written to an [`EventSource`](super::EventSource).
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    /// Event name. Activity events use the `<Operation>.Start`,
    /// `<Operation>.Stop` and `<Operation>.Exception` convention.
    pub name: Cow<'static, str>,
    /// Verbosity.
    pub level: EventLevel,
    /// Human readable message template.
    pub message: Option<Cow<'static, str>>,
    /// Typed payload.
    pub payload: EventPayload,
}

impl Event {
    /// Creates an event without message or payload.
    pub fn new(name: impl Into<Cow<'static, str>>, level: EventLevel) -> Self {
        Self {
            name: name.into(),
            level,
            message: None,
            payload: EventPayload::None,
        }
    }

    /// Sets the message.
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets the payload.
    pub fn with_payload(mut self, payload: EventPayload) -> Self {
        self.payload = payload;
        self
    }

    /// `<operation>.Start` carrying the activity.
    pub fn activity_start(activity: Activity) -> Self {
        Self::new(format!("{}.Start", activity.operation), EventLevel::Informational)
            .with_payload(EventPayload::Activity(activity))
    }

    /// `<operation>.Stop` carrying the activity.
    pub fn activity_stop(activity: Activity) -> Self {
        Self::new(format!("{}.Stop", activity.operation), EventLevel::Informational)
            .with_payload(EventPayload::Activity(activity))
    }

    /// `<operation>.Exception` carrying the failed activity.
    pub fn activity_exception(activity: Activity, message: impl Into<String>) -> Self {
        Self::new(format!("{}.Exception", activity.operation), EventLevel::Error).with_payload(
            EventPayload::Error {
                activity: Some(activity),
                message: message.into(),
            },
        )
    }
}
