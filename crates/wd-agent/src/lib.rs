// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Watchdog Client Agent — in-page telemetry capture and delivery
//!
//! This crate implements the client-side half of the watchdog monitoring
//! pipeline: it taps the host runtime's global channels (errors, rejections,
//! console, user interaction, performance signals, outgoing fetches),
//! accumulates structured entries in a bounded FIFO queue and ships them to
//! the ingestion endpoint in batches — on a timer, on queue pressure and on
//! page lifecycle events.
//!
//! Two hard rules shape everything here:
//!
//! - **Transparency.** Wrapped capabilities forward to the original
//!   unchanged; listeners are passive. The instrumented page must behave
//!   exactly as it would without the agent.
//! - **No backpressure.** Capture never blocks and delivery is
//!   fire-and-forget. Every failure — a missing host capability, a poisoned
//!   lock, an unreachable backend — degrades to lost telemetry and nothing
//!   else.

pub mod agent;
pub mod clock;
pub mod config;
pub mod hooks;
pub mod location;
pub mod test_utils;
pub mod transport;

// Re-export key types
pub use agent::{AgentHandle, AgentStats, WatchdogAgent, WatchdogBuilder};
pub use clock::{Clock, SystemClock};
pub use config::AgentConfig;
pub use location::{PageLocation, StaticLocation};
pub use transport::{BatchTransport, HttpTransport};
pub use wd_proto::{EventKind, LogBatch, LogEntry};
