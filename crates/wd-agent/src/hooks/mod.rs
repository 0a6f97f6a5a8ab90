// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Interception points over the host runtime's global channels.
//!
//! Channels come in two shapes. Call-through capabilities (console, fetch,
//! history) are wrapped by decorator types that take the original capability
//! as an explicit dependency and forward every call to it unchanged; the host
//! substitutes the wrapped value at the call site. Listener channels (errors,
//! interaction, performance, lifecycle) are driven by the host invoking the
//! matching sink trait — `WatchdogAgent` implements all of them.
//!
//! Installation is independently fault-tolerant per channel: a host that
//! cannot offer one capability loses only that channel's telemetry.

pub mod console;
pub mod errors;
pub mod fetch;
pub mod history;
pub mod interaction;
pub mod performance;

use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::agent::{AgentHandle, WatchdogAgent};

pub use console::{instrument_console, ConsoleApi, InstrumentedConsole};
pub use errors::{ErrorSink, Rejection, ScriptError};
pub use fetch::{
    instrument_fetch, FetchBackend, FetchFailure, FetchRequest, FetchResponse, InstrumentedFetch,
};
pub use history::{instrument_history, HistoryApi, InstrumentedHistory};
pub use interaction::{ClickTarget, FormSubmit, InteractionSink, NavigationKind};
pub use performance::{PageLoadTiming, PerformanceSink, ResourceTiming};

/// Failure to attach to one host channel. Contained per installer; never
/// propagated out of `init`.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("channel unavailable: {0}")]
    Unavailable(&'static str),

    #[error("channel registration failed: {0}")]
    Registration(String),
}

/// Page lifecycle notifications relevant to flush scheduling.
pub trait LifecycleSink: Send + Sync {
    /// The page is about to unload. Best-effort; not guaranteed to fire on
    /// abrupt teardown.
    fn before_unload(&self);

    /// Page visibility transitioned to hidden.
    fn visibility_hidden(&self);
}

impl LifecycleSink for WatchdogAgent {
    fn before_unload(&self) {
        self.log(
            wd_proto::EventKind::PageUnload,
            "page unloading",
            serde_json::Map::new(),
        );
        self.flush_logs();
    }

    fn visibility_hidden(&self) {
        self.flush_logs();
    }
}

pub type BoxedConsole = Box<dyn ConsoleApi>;
pub type BoxedFetch = Box<dyn FetchBackend>;
pub type BoxedHistory = Box<dyn HistoryApi>;

/// Deferred-init callback; the host calls it back with itself once the
/// document becomes ready.
pub type ReadyCallback = Box<dyn FnOnce(&mut dyn HostRuntime) + Send>;

/// Capabilities surfaced by the embedding runtime.
///
/// Each installer may fail independently when the underlying channel is
/// absent; [`install_all`] skips the failed channel and proceeds.
pub trait HostRuntime {
    /// True once the document's interactive content is parseable.
    fn document_ready(&self) -> bool;

    /// Run `callback` once the document becomes ready.
    fn when_ready(&mut self, callback: ReadyCallback);

    fn install_error_sink(&mut self, sink: Arc<dyn ErrorSink>) -> Result<(), HookError>;

    fn install_interaction_sink(&mut self, sink: Arc<dyn InteractionSink>)
        -> Result<(), HookError>;

    fn install_performance_sink(&mut self, sink: Arc<dyn PerformanceSink>)
        -> Result<(), HookError>;

    fn install_lifecycle_sink(&mut self, sink: Arc<dyn LifecycleSink>) -> Result<(), HookError>;

    /// Replace the console capability with the value `swap` returns for it.
    fn swap_console(
        &mut self,
        swap: &mut dyn FnMut(BoxedConsole) -> BoxedConsole,
    ) -> Result<(), HookError>;

    /// Replace the fetch capability with the value `swap` returns for it.
    fn swap_fetch(&mut self, swap: &mut dyn FnMut(BoxedFetch) -> BoxedFetch)
        -> Result<(), HookError>;

    /// Replace the history capability with the value `swap` returns for it.
    fn swap_history(
        &mut self,
        swap: &mut dyn FnMut(BoxedHistory) -> BoxedHistory,
    ) -> Result<(), HookError>;
}

/// Attach the agent to every channel the host exposes. One failing channel
/// never disables the others.
pub(crate) fn install_all(agent: &AgentHandle, host: &mut dyn HostRuntime) {
    let console_agent = Arc::clone(agent);
    let fetch_agent = Arc::clone(agent);
    let history_agent = Arc::clone(agent);

    let results: [(&str, Result<(), HookError>); 7] = [
        (
            "uncaught-errors",
            host.install_error_sink(Arc::clone(agent) as Arc<dyn ErrorSink>),
        ),
        (
            "interaction",
            host.install_interaction_sink(Arc::clone(agent) as Arc<dyn InteractionSink>),
        ),
        (
            "performance",
            host.install_performance_sink(Arc::clone(agent) as Arc<dyn PerformanceSink>),
        ),
        (
            "lifecycle",
            host.install_lifecycle_sink(Arc::clone(agent) as Arc<dyn LifecycleSink>),
        ),
        (
            "console",
            host.swap_console(&mut move |original| {
                Box::new(instrument_console(original, Arc::clone(&console_agent)))
            }),
        ),
        (
            "fetch",
            host.swap_fetch(&mut move |original| {
                Box::new(instrument_fetch(original, Arc::clone(&fetch_agent)))
            }),
        ),
        (
            "history",
            host.swap_history(&mut move |original| {
                Box::new(instrument_history(original, Arc::clone(&history_agent)))
            }),
        ),
    ];

    for (channel, result) in results {
        if let Err(err) = result {
            debug!(channel, error = %err, "host channel unavailable, skipped");
        }
    }
}
