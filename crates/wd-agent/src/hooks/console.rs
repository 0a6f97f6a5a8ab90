// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Console channel decorator.

use serde_json::Map;
use wd_proto::EventKind;

use crate::agent::AgentHandle;

/// The host's console capability, reduced to the channels the agent taps.
pub trait ConsoleApi: Send + Sync {
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
}

impl<C: ConsoleApi + ?Sized> ConsoleApi for Box<C> {
    fn error(&self, message: &str) {
        (**self).error(message)
    }

    fn warn(&self, message: &str) {
        (**self).warn(message)
    }
}

/// Decorator that records console errors and warnings as telemetry, then
/// forwards every call to the wrapped console unchanged — developer-visible
/// output is preserved exactly.
pub struct InstrumentedConsole<C> {
    inner: C,
    agent: AgentHandle,
}

impl<C: ConsoleApi> InstrumentedConsole<C> {
    pub fn new(inner: C, agent: AgentHandle) -> Self {
        Self { inner, agent }
    }

    /// Hand back the original console.
    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: ConsoleApi> ConsoleApi for InstrumentedConsole<C> {
    fn error(&self, message: &str) {
        self.agent.log(EventKind::ConsoleError, message, Map::new());
        self.inner.error(message);
    }

    fn warn(&self, message: &str) {
        self.agent.log(EventKind::ConsoleWarn, message, Map::new());
        self.inner.warn(message);
    }
}

/// Wrap `console`; the call site substitutes the returned value.
pub fn instrument_console<C: ConsoleApi>(console: C, agent: AgentHandle) -> InstrumentedConsole<C> {
    InstrumentedConsole::new(console, agent)
}
