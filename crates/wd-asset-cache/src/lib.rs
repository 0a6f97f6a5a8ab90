// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Watchdog Asset Cache Worker — offline caching for static assets
//!
//! A background worker that serves a fixed, enumerated set of static assets
//! without a network round-trip once cached. Assets live in a named cache
//! generation; installing a new generation precaches the full asset set
//! all-or-nothing, and activating it purges every stale generation wholesale.
//! While active, GET requests under the static path prefix are answered
//! cache-first; everything else passes through untouched.
//!
//! The worker is independent of the telemetry agent and shares nothing with
//! it beyond living in the same deployment.

pub mod fetcher;
pub mod storage;
pub mod test_utils;
pub mod worker;

use thiserror::Error;

// Re-export key types
pub use fetcher::{AssetFetcher, HttpFetcher};
pub use storage::{CacheGeneration, CacheStorage, CachedResponse, MemoryCacheStorage};
pub use worker::{AssetCacheWorker, AssetRequest, ServiceScope, WorkerConfig, WorkerPhase};

/// Errors surfaced by cache population and lookup.
///
/// Install-time failures propagate (a partially populated asset cache is
/// worse than none); runtime failures degrade to "no offline caching".
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("storage backend failure: {0}")]
    Storage(String),

    #[error("network failure for {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("precache fetch for {url} returned status {status}")]
    PrecacheStatus { url: String, status: u16 },
}
