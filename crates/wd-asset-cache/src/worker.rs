// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Worker lifecycle and request interception.
//!
//! Phases run strictly forward: Installing → Waiting → Active. `install`
//! populates the configured generation all-or-nothing; `activate` purges
//! every other generation and claims open pages; only an Active worker
//! intercepts requests.

use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::fetcher::AssetFetcher;
use crate::storage::{CacheStorage, CachedResponse};
use crate::CacheError;

/// Default URL prefix below which GET requests are served through the cache.
pub const DEFAULT_STATIC_PREFIX: &str = "/static/";

/// Worker configuration: one generation name plus the assets it precaches.
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Versioned cache generation name, e.g. `wd-assets-v3`
    pub generation: String,
    /// Path prefix identifying interceptable requests
    pub static_prefix: String,
    /// Asset paths fetched and stored at install time
    pub precache: Vec<String>,
}

impl WorkerConfig {
    pub fn new(generation: impl Into<String>) -> Self {
        Self {
            generation: generation.into(),
            static_prefix: DEFAULT_STATIC_PREFIX.to_string(),
            precache: Vec::new(),
        }
    }

    pub fn with_static_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.static_prefix = prefix.into();
        self
    }

    pub fn with_precache<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.precache = assets.into_iter().map(Into::into).collect();
        self
    }
}

/// Lifecycle phases, in order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerPhase {
    Installing,
    Waiting,
    Active,
}

/// Pages controlled by the worker, claimed on activation so a new generation
/// takes effect without a reload.
pub trait ServiceScope: Send + Sync {
    fn claim_clients(&self);
}

/// Scope for hosts without page tracking.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopScope;

impl ServiceScope for NoopScope {
    fn claim_clients(&self) {}
}

/// An intercepted request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AssetRequest {
    pub method: String,
    pub url: String,
}

impl AssetRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
        }
    }

    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
        }
    }
}

/// The asset cache worker. One instance per deployment generation.
pub struct AssetCacheWorker {
    config: WorkerConfig,
    storage: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn AssetFetcher>,
    scope: Arc<dyn ServiceScope>,
    phase: Mutex<WorkerPhase>,
}

impl AssetCacheWorker {
    pub fn new(
        config: WorkerConfig,
        storage: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn AssetFetcher>,
    ) -> Self {
        Self {
            config,
            storage,
            fetcher,
            scope: Arc::new(NoopScope),
            phase: Mutex::new(WorkerPhase::Installing),
        }
    }

    pub fn with_scope(mut self, scope: Arc<dyn ServiceScope>) -> Self {
        self.scope = scope;
        self
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase.lock().map(|phase| *phase).unwrap_or(WorkerPhase::Installing)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Populate the configured generation with the full precache set.
    ///
    /// All-or-nothing: every asset is fetched before anything is stored, so
    /// one failed or non-success fetch fails the install and leaves no
    /// partial generation behind.
    pub async fn install(&self) -> Result<(), CacheError> {
        let mut fetched = Vec::with_capacity(self.config.precache.len());
        for path in &self.config.precache {
            let response = self.fetcher.fetch(path).await?;
            if !response.is_success() {
                return Err(CacheError::PrecacheStatus {
                    url: path.clone(),
                    status: response.status,
                });
            }
            fetched.push((path.clone(), response));
        }

        let generation = self.storage.open(&self.config.generation).await?;
        for (path, response) in fetched {
            generation.put(&path, response).await?;
        }

        self.set_phase(WorkerPhase::Waiting);
        debug!(
            generation = %self.config.generation,
            assets = self.config.precache.len(),
            "precache populated"
        );
        Ok(())
    }

    /// Promote this worker's generation: delete every other generation, then
    /// claim open pages.
    pub async fn activate(&self) -> Result<(), CacheError> {
        for name in self.storage.names().await? {
            if name != self.config.generation {
                let removed = self.storage.delete(&name).await?;
                trace!(generation = %name, removed, "purged stale generation");
            }
        }
        self.scope.claim_clients();
        self.set_phase(WorkerPhase::Active);
        debug!(generation = %self.config.generation, "worker active");
        Ok(())
    }

    /// Serve an intercepted request cache-first.
    ///
    /// Returns `None` when the request is not intercepted — non-GET, outside
    /// the static prefix, or the worker is not active — and the caller
    /// performs its own fetch untouched. A miss fetches over the network and
    /// stores a copy only when the response indicates success.
    pub async fn handle_fetch(
        &self,
        request: &AssetRequest,
    ) -> Result<Option<CachedResponse>, CacheError> {
        if self.phase() != WorkerPhase::Active || !self.intercepts(request) {
            return Ok(None);
        }

        let path = request_path(&request.url);
        let generation = self.storage.open(&self.config.generation).await?;

        if let Some(cached) = generation.get(&path).await? {
            trace!(%path, "cache hit");
            return Ok(Some(cached));
        }

        let response = self.fetcher.fetch(&path).await?;
        if response.is_success() {
            if let Err(err) = generation.put(&path, response.clone()).await {
                debug!(%path, error = %err, "failed to store asset copy");
            }
        }
        Ok(Some(response))
    }

    fn intercepts(&self, request: &AssetRequest) -> bool {
        request.method.eq_ignore_ascii_case("GET")
            && request_path(&request.url).starts_with(&self.config.static_prefix)
    }

    fn set_phase(&self, phase: WorkerPhase) {
        if let Ok(mut current) = self.phase.lock() {
            *current = phase;
        }
    }
}

/// Path component of a request URL: scheme and host stripped, query and
/// fragment cut off.
fn request_path(url: &str) -> String {
    let after_scheme = match url.split_once("://") {
        Some((_, rest)) => match rest.find('/') {
            Some(index) => &rest[index..],
            None => "/",
        },
        None => url,
    };
    let end = after_scheme
        .find(['?', '#'])
        .unwrap_or(after_scheme.len());
    after_scheme[..end].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_path_strips_origin_query_and_fragment() {
        assert_eq!(request_path("/static/js/app.js"), "/static/js/app.js");
        assert_eq!(
            request_path("https://example.test/static/css/app.css?v=3"),
            "/static/css/app.css"
        );
        assert_eq!(request_path("https://example.test"), "/");
        assert_eq!(request_path("/static/img/logo.png#top"), "/static/img/logo.png");
    }

    #[test]
    fn interception_requires_get_and_the_static_prefix() {
        let worker = AssetCacheWorker::new(
            WorkerConfig::new("assets-v1"),
            Arc::new(crate::storage::MemoryCacheStorage::new()),
            Arc::new(crate::test_utils::ScriptedFetcher::new()),
        );

        assert!(worker.intercepts(&AssetRequest::get("/static/js/app.js")));
        assert!(worker.intercepts(&AssetRequest::get("https://example.test/static/js/app.js")));
        assert!(!worker.intercepts(&AssetRequest::new("POST", "/static/js/app.js")));
        assert!(!worker.intercepts(&AssetRequest::get("/api/history")));
    }
}
