// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! JSON message types for the watchdog telemetry protocol

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Classification tag for one captured telemetry record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// Agent came up on a fresh page load
    ClientInit,
    /// Uncaught synchronous error
    JsError,
    /// Unhandled asynchronous rejection
    PromiseRejection,
    /// Console error call
    ConsoleError,
    /// Console warning call
    ConsoleWarn,
    /// Click on an interactive element
    UserClick,
    /// Form submission
    FormSubmit,
    /// History traversal or programmatic route change
    Navigation,
    /// Main-thread task above the duration threshold
    LongTask,
    /// Resource fetch above the duration threshold
    SlowResource,
    /// Page load completed
    PageLoad,
    /// Page load above the duration threshold
    SlowPageLoad,
    /// Instrumented fetch above the duration threshold
    SlowFetch,
    /// Instrumented fetch resolved with a non-2xx status
    FetchError,
    /// Instrumented fetch failed at the network level
    NetworkError,
    /// Page is unloading
    PageUnload,
    /// Collaborator-emitted event
    CustomEvent,
    /// Collaborator-reported error
    ManualError,
}

impl EventKind {
    /// Wire tag, also used for tracing fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ClientInit => "CLIENT_INIT",
            EventKind::JsError => "JS_ERROR",
            EventKind::PromiseRejection => "PROMISE_REJECTION",
            EventKind::ConsoleError => "CONSOLE_ERROR",
            EventKind::ConsoleWarn => "CONSOLE_WARN",
            EventKind::UserClick => "USER_CLICK",
            EventKind::FormSubmit => "FORM_SUBMIT",
            EventKind::Navigation => "NAVIGATION",
            EventKind::LongTask => "LONG_TASK",
            EventKind::SlowResource => "SLOW_RESOURCE",
            EventKind::PageLoad => "PAGE_LOAD",
            EventKind::SlowPageLoad => "SLOW_PAGE_LOAD",
            EventKind::SlowFetch => "SLOW_FETCH",
            EventKind::FetchError => "FETCH_ERROR",
            EventKind::NetworkError => "NETWORK_ERROR",
            EventKind::PageUnload => "PAGE_UNLOAD",
            EventKind::CustomEvent => "CUSTOM_EVENT",
            EventKind::ManualError => "MANUAL_ERROR",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One captured telemetry record.
///
/// Entries are immutable once constructed: the agent builds them at capture
/// time and the queue only ever moves them around wholesale. `data` is always
/// present on the wire, defaulting to an empty mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Capture time, monotonically non-decreasing within a session
    pub timestamp: DateTime<Utc>,
    /// Opaque per-page-load identifier
    pub session_id: String,
    pub event_type: EventKind,
    /// Short human-readable description, bounded at capture
    pub message: String,
    /// Auxiliary fields, shape varies per event kind
    #[serde(default)]
    pub data: Map<String, Value>,
    /// Path component of the page location at capture time
    pub url: String,
}

impl LogEntry {
    pub fn new(
        timestamp: DateTime<Utc>,
        session_id: impl Into<String>,
        event_type: EventKind,
        message: impl Into<String>,
        data: Map<String, Value>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            session_id: session_id.into(),
            event_type,
            message: message.into(),
            data,
            url: url.into(),
        }
    }
}

/// Batch envelope posted to the ingestion endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LogBatch {
    /// Entries in capture (FIFO) order
    pub logs: Vec<LogEntry>,
}

impl LogBatch {
    pub fn is_empty(&self) -> bool {
        self.logs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.logs.len()
    }
}
