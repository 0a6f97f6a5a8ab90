// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! The watchdog agent: a single owned instance per page load that accumulates
//! captured entries in a bounded FIFO queue and flushes them to the backend
//! on a timer, on queue pressure, and on page lifecycle events.
//!
//! Capture never blocks and never fails: a poisoned lock, a disabled agent or
//! an unencodable batch all degrade to dropped telemetry, by design.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};
use uuid::Uuid;
use wd_proto::{sanitize_message, EventKind, LogBatch, LogEntry};

use crate::clock::{Clock, SystemClock};
use crate::config::{AgentConfig, MESSAGE_MAX_LEN};
use crate::hooks::{self, HostRuntime};
use crate::location::{PageLocation, StaticLocation};
use crate::transport::BatchTransport;

/// Shared handle to the page's agent instance. Collaborators that need to
/// emit custom events receive this handle explicitly.
pub type AgentHandle = Arc<WatchdogAgent>;

/// Counters accumulated over the lifetime of one agent instance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AgentStats {
    /// Entries accepted into the queue
    pub entries_captured: u64,
    /// Entries refused while the agent was disabled
    pub entries_dropped: u64,
    /// Batches handed to the transport
    pub batches_dispatched: u64,
    /// Flushes forced by the queue reaching capacity
    pub eager_flushes: u64,
}

struct AgentState {
    queue: VecDeque<LogEntry>,
    enabled: bool,
    initialized: bool,
    last_timestamp: Option<DateTime<Utc>>,
    stats: AgentStats,
}

/// Client-side telemetry agent. Construct via [`WatchdogAgent::builder`],
/// then call [`WatchdogAgent::init`] once the host runtime is available.
pub struct WatchdogAgent {
    config: AgentConfig,
    transport: Arc<dyn BatchTransport>,
    clock: Arc<dyn Clock>,
    location: Arc<dyn PageLocation>,
    session_id: String,
    state: Mutex<AgentState>,
}

/// Builder for [`WatchdogAgent`]. The transport is the one mandatory
/// dependency; clock and location default to the ambient environment.
pub struct WatchdogBuilder {
    config: AgentConfig,
    transport: Arc<dyn BatchTransport>,
    clock: Arc<dyn Clock>,
    location: Arc<dyn PageLocation>,
}

impl WatchdogBuilder {
    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn location(mut self, location: Arc<dyn PageLocation>) -> Self {
        self.location = location;
        self
    }

    pub fn build(self) -> AgentHandle {
        let session_id = Uuid::new_v4().to_string();
        debug!(session = %session_id, "watchdog agent created");
        Arc::new(WatchdogAgent {
            config: self.config,
            transport: self.transport,
            clock: self.clock,
            location: self.location,
            session_id,
            state: Mutex::new(AgentState {
                queue: VecDeque::new(),
                enabled: true,
                initialized: false,
                last_timestamp: None,
                stats: AgentStats::default(),
            }),
        })
    }
}

impl WatchdogAgent {
    pub fn builder(transport: Arc<dyn BatchTransport>) -> WatchdogBuilder {
        WatchdogBuilder {
            config: AgentConfig::default(),
            transport,
            clock: Arc::new(SystemClock),
            location: Arc::new(StaticLocation::root()),
        }
    }

    /// Opaque identifier for this page load. Stable for the lifetime of the
    /// instance, not persisted across reloads.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn stats(&self) -> AgentStats {
        self.state.lock().map(|state| state.stats).unwrap_or_default()
    }

    pub fn queue_len(&self) -> usize {
        self.state.lock().map(|state| state.queue.len()).unwrap_or(0)
    }

    /// Runtime kill switch. While disabled, `log` is a no-op; already queued
    /// entries still flush normally.
    pub fn set_enabled(&self, enabled: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.enabled = enabled;
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().map(|state| state.enabled).unwrap_or(false)
    }

    /// Attach to the host runtime: install every interception channel, emit
    /// the synthetic `CLIENT_INIT` entry and start the periodic flush timer.
    ///
    /// Defers itself until the document is ready, and is idempotent — the
    /// channels are installed at most once per instance.
    pub fn init(self: &Arc<Self>, host: &mut dyn HostRuntime) {
        if !host.document_ready() {
            let agent = Arc::clone(self);
            host.when_ready(Box::new(move |host| agent.init(host)));
            return;
        }

        {
            let Ok(mut state) = self.state.lock() else { return };
            if state.initialized {
                return;
            }
            state.initialized = true;
        }

        hooks::install_all(self, host);
        self.log(EventKind::ClientInit, "watchdog client initialised", Map::new());
        self.spawn_flush_timer();
    }

    /// Append one entry to the queue. Never blocks, never fails; a no-op
    /// while the agent is disabled. Reaching the queue capacity triggers an
    /// eager flush.
    pub fn log(&self, kind: EventKind, message: impl AsRef<str>, data: Map<String, Value>) {
        let url = self.location.path();
        let now = self.clock.now();

        let batch = {
            let Ok(mut state) = self.state.lock() else { return };
            if !state.enabled {
                state.stats.entries_dropped += 1;
                return;
            }

            // Clamp so per-session timestamps never decrease.
            let timestamp = match state.last_timestamp {
                Some(prev) if now < prev => prev,
                _ => now,
            };
            state.last_timestamp = Some(timestamp);

            let message = sanitize_message(message.as_ref(), MESSAGE_MAX_LEN);
            state.queue.push_back(LogEntry::new(
                timestamp,
                &self.session_id,
                kind,
                message,
                data,
                url,
            ));
            state.stats.entries_captured += 1;
            trace!(kind = %kind, queued = state.queue.len(), "captured entry");

            if state.queue.len() >= self.config.max_queue_size {
                state.stats.eager_flushes += 1;
                Some(Self::detach_batch(&mut state, self.config.max_queue_size))
            } else {
                None
            }
        };

        if let Some(batch) = batch {
            self.dispatch(batch);
        }
    }

    /// Detach up to `max_queue_size` entries from the head of the queue and
    /// hand them to the transport as one batch. A no-op on an empty queue.
    ///
    /// Detaching happens atomically under the state lock, before any
    /// asynchronous step: entries captured during an in-flight transmission
    /// land in the next batch, never in the current one.
    pub fn flush_logs(&self) {
        let batch = {
            let Ok(mut state) = self.state.lock() else { return };
            if state.queue.is_empty() {
                return;
            }
            Self::detach_batch(&mut state, self.config.max_queue_size)
        };
        self.dispatch(batch);
    }

    /// Convenience wrapper for collaborator code: emit a `CUSTOM_EVENT`.
    pub fn track_custom_event(&self, name: &str, data: Map<String, Value>) {
        self.log(EventKind::CustomEvent, name, data);
    }

    /// Convenience wrapper for collaborator code: emit a `MANUAL_ERROR`.
    pub fn track_error(&self, message: &str, context: Option<&str>) {
        let mut data = Map::new();
        if let Some(context) = context {
            data.insert("context".into(), Value::String(context.to_string()));
        }
        self.log(EventKind::ManualError, message, data);
    }

    pub(crate) fn record_navigation(&self, path: &str, kind: crate::hooks::NavigationKind) {
        let mut data = Map::new();
        data.insert("path".into(), Value::String(path.to_string()));
        data.insert("kind".into(), Value::String(kind.as_str().to_string()));
        self.log(EventKind::Navigation, path, data);
    }

    fn detach_batch(state: &mut AgentState, max: usize) -> LogBatch {
        let take = state.queue.len().min(max);
        let logs: Vec<LogEntry> = state.queue.drain(..take).collect();
        state.stats.batches_dispatched += 1;
        LogBatch { logs }
    }

    fn dispatch(&self, batch: LogBatch) {
        let payload = match wd_proto::encode_batch(&batch) {
            Ok(payload) => payload,
            Err(err) => {
                debug!(error = %err, "dropping unencodable batch");
                return;
            }
        };

        if self.transport.send_beacon(&payload) {
            trace!(entries = batch.len(), "batch handed to beacon dispatcher");
            return;
        }

        let transport = Arc::clone(&self.transport);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = transport.send_keepalive(payload).await {
                        trace!(error = %err, "telemetry batch lost");
                    }
                });
            }
            // Accepted loss: no beacon primitive and no runtime to fall
            // back onto.
            Err(_) => debug!(entries = batch.len(), "no async runtime, batch dropped"),
        }
    }

    fn spawn_flush_timer(self: &Arc<Self>) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                debug!("no async runtime, periodic flush disabled");
                return;
            }
        };

        // The timer holds only a weak handle so page teardown (dropping the
        // last strong handle) ends it.
        let weak: Weak<WatchdogAgent> = Arc::downgrade(self);
        let period = self.config.flush_interval;
        handle.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a tokio interval completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match weak.upgrade() {
                    Some(agent) => agent.flush_logs(),
                    None => break,
                }
            }
        });
    }
}
