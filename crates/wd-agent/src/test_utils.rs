// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Test utilities for exercising the agent without a live host runtime:
//! a recording transport, a manual clock and fake host capabilities.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use wd_proto::{decode_batch, LogBatch};

use crate::clock::Clock;
use crate::hooks::{
    BoxedConsole, BoxedFetch, BoxedHistory, ConsoleApi, ErrorSink, FetchBackend, FetchFailure,
    FetchRequest, FetchResponse, HistoryApi, HookError, HostRuntime, InteractionSink,
    LifecycleSink, PerformanceSink, ReadyCallback,
};
use crate::transport::BatchTransport;

/// A transport that decodes and collects every batch for inspection.
pub struct RecordingTransport {
    beacon_enabled: bool,
    batches: Mutex<Vec<LogBatch>>,
    keepalive_sends: Mutex<u64>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self {
            beacon_enabled: true,
            batches: Mutex::new(Vec::new()),
            keepalive_sends: Mutex::new(0),
        }
    }

    /// A transport whose beacon primitive is unavailable, forcing the
    /// keepalive fallback path.
    pub fn without_beacon() -> Self {
        Self {
            beacon_enabled: false,
            ..Self::new()
        }
    }

    /// The collected batches, in dispatch order.
    pub fn batches(&self) -> Vec<LogBatch> {
        self.batches.lock().unwrap().clone()
    }

    /// How many batches arrived through the keepalive fallback.
    pub fn keepalive_sends(&self) -> u64 {
        *self.keepalive_sends.lock().unwrap()
    }

    fn record(&self, payload: &[u8]) {
        let batch = decode_batch(payload).expect("transport received malformed batch");
        self.batches.lock().unwrap().push(batch);
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchTransport for RecordingTransport {
    fn send_beacon(&self, payload: &[u8]) -> bool {
        if !self.beacon_enabled {
            return false;
        }
        self.record(payload);
        true
    }

    async fn send_keepalive(&self, payload: Vec<u8>) -> Result<()> {
        *self.keepalive_sends.lock().unwrap() += 1;
        self.record(&payload);
        Ok(())
    }
}

/// A clock driven explicitly by the test.
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Console fake that collects forwarded output.
#[derive(Default)]
pub struct CountingConsole {
    errors: Mutex<Vec<String>>,
    warns: Mutex<Vec<String>>,
}

impl CountingConsole {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn warns(&self) -> Vec<String> {
        self.warns.lock().unwrap().clone()
    }
}

impl ConsoleApi for CountingConsole {
    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.warns.lock().unwrap().push(message.to_string());
    }
}

/// History fake that records forwarded calls.
#[derive(Default)]
pub struct RecordingHistory {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingHistory {
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl HistoryApi for RecordingHistory {
    fn push_state(&self, path: &str) {
        self.calls.lock().unwrap().push(("push".to_string(), path.to_string()));
    }

    fn replace_state(&self, path: &str) {
        self.calls.lock().unwrap().push(("replace".to_string(), path.to_string()));
    }
}

/// Fetch backend that replays scripted outcomes, each after an optional
/// delay. An exhausted script answers 200 immediately.
pub struct ScriptedFetch {
    outcomes: Mutex<VecDeque<(Duration, Result<FetchResponse, FetchFailure>)>>,
}

impl ScriptedFetch {
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
        }
    }

    pub fn push_response(&self, delay: Duration, outcome: Result<FetchResponse, FetchFailure>) {
        self.outcomes.lock().unwrap().push_back((delay, outcome));
    }
}

impl Default for ScriptedFetch {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FetchBackend for ScriptedFetch {
    async fn fetch(&self, _request: FetchRequest) -> Result<FetchResponse, FetchFailure> {
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some((delay, outcome)) => {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                outcome
            }
            None => Ok(FetchResponse::with_status(200)),
        }
    }
}

/// Host runtime fake. Channels can be disabled individually to exercise the
/// per-installer fault tolerance, and readiness can be deferred.
pub struct MockHost {
    ready: bool,
    pending: Vec<ReadyCallback>,
    unavailable: HashSet<&'static str>,
    installed: Vec<&'static str>,
    pub error_sink: Option<Arc<dyn ErrorSink>>,
    pub interaction_sink: Option<Arc<dyn InteractionSink>>,
    pub performance_sink: Option<Arc<dyn PerformanceSink>>,
    pub lifecycle_sink: Option<Arc<dyn LifecycleSink>>,
    console: Option<BoxedConsole>,
    fetch: Option<BoxedFetch>,
    history: Option<BoxedHistory>,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            ready: true,
            pending: Vec::new(),
            unavailable: HashSet::new(),
            installed: Vec::new(),
            error_sink: None,
            interaction_sink: None,
            performance_sink: None,
            lifecycle_sink: None,
            console: Some(Box::new(CountingConsole::default())),
            fetch: Some(Box::new(ScriptedFetch::new())),
            history: Some(Box::new(RecordingHistory::default())),
        }
    }

    /// A host whose document is not yet ready.
    pub fn not_ready() -> Self {
        Self {
            ready: false,
            ..Self::new()
        }
    }

    /// Mark `channel` unavailable so its installer fails.
    pub fn without_channel(mut self, channel: &'static str) -> Self {
        self.unavailable.insert(channel);
        self
    }

    /// Flip the document to ready and run deferred callbacks.
    pub fn make_ready(&mut self) {
        self.ready = true;
        let callbacks = std::mem::take(&mut self.pending);
        for callback in callbacks {
            callback(self);
        }
    }

    /// Channels that installed successfully, in installation order.
    pub fn installed_channels(&self) -> &[&'static str] {
        &self.installed
    }

    /// The (possibly wrapped) console capability.
    pub fn console(&self) -> &BoxedConsole {
        self.console.as_ref().expect("console channel disabled")
    }

    /// The (possibly wrapped) history capability.
    pub fn history(&self) -> &BoxedHistory {
        self.history.as_ref().expect("history channel disabled")
    }

    fn check(&mut self, channel: &'static str) -> Result<(), HookError> {
        if self.unavailable.contains(channel) {
            return Err(HookError::Unavailable(channel));
        }
        self.installed.push(channel);
        Ok(())
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostRuntime for MockHost {
    fn document_ready(&self) -> bool {
        self.ready
    }

    fn when_ready(&mut self, callback: ReadyCallback) {
        self.pending.push(callback);
    }

    fn install_error_sink(&mut self, sink: Arc<dyn ErrorSink>) -> Result<(), HookError> {
        self.check("uncaught-errors")?;
        self.error_sink = Some(sink);
        Ok(())
    }

    fn install_interaction_sink(
        &mut self,
        sink: Arc<dyn InteractionSink>,
    ) -> Result<(), HookError> {
        self.check("interaction")?;
        self.interaction_sink = Some(sink);
        Ok(())
    }

    fn install_performance_sink(
        &mut self,
        sink: Arc<dyn PerformanceSink>,
    ) -> Result<(), HookError> {
        self.check("performance")?;
        self.performance_sink = Some(sink);
        Ok(())
    }

    fn install_lifecycle_sink(&mut self, sink: Arc<dyn LifecycleSink>) -> Result<(), HookError> {
        self.check("lifecycle")?;
        self.lifecycle_sink = Some(sink);
        Ok(())
    }

    fn swap_console(
        &mut self,
        swap: &mut dyn FnMut(BoxedConsole) -> BoxedConsole,
    ) -> Result<(), HookError> {
        self.check("console")?;
        let original = self.console.take().ok_or(HookError::Unavailable("console"))?;
        self.console = Some(swap(original));
        Ok(())
    }

    fn swap_fetch(
        &mut self,
        swap: &mut dyn FnMut(BoxedFetch) -> BoxedFetch,
    ) -> Result<(), HookError> {
        self.check("fetch")?;
        let original = self.fetch.take().ok_or(HookError::Unavailable("fetch"))?;
        self.fetch = Some(swap(original));
        Ok(())
    }

    fn swap_history(
        &mut self,
        swap: &mut dyn FnMut(BoxedHistory) -> BoxedHistory,
    ) -> Result<(), HookError> {
        self.check("history")?;
        let original = self.history.take().ok_or(HookError::Unavailable("history"))?;
        self.history = Some(swap(original));
        Ok(())
    }
}
