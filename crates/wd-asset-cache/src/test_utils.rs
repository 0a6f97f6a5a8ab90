// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Test utilities: a scripted asset fetcher that counts its calls, and a
//! claim-counting service scope.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::fetcher::AssetFetcher;
use crate::storage::CachedResponse;
use crate::worker::ServiceScope;
use crate::CacheError;

/// Fetcher answering from a scripted response table. Paths without a script
/// entry answer 404; every call is recorded for assertions.
pub struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Result<CachedResponse, String>>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Script a successful response for `path`.
    pub fn serve(&self, path: impl Into<String>, response: CachedResponse) {
        self.responses.lock().unwrap().insert(path.into(), Ok(response));
    }

    /// Script a network failure for `path`.
    pub fn fail(&self, path: impl Into<String>, reason: impl Into<String>) {
        self.responses.lock().unwrap().insert(path.into(), Err(reason.into()));
    }

    /// Every fetched path, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// How many times `path` was fetched.
    pub fn calls_for(&self, path: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|call| call.as_str() == path).count()
    }
}

impl Default for ScriptedFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AssetFetcher for ScriptedFetcher {
    async fn fetch(&self, path: &str) -> Result<CachedResponse, CacheError> {
        self.calls.lock().unwrap().push(path.to_string());
        match self.responses.lock().unwrap().get(path) {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(reason)) => Err(CacheError::Network {
                url: path.to_string(),
                reason: reason.clone(),
            }),
            None => Ok(CachedResponse::with_status(404)),
        }
    }
}

/// Scope that counts claim calls.
#[derive(Default)]
pub struct CountingScope {
    claims: AtomicUsize,
}

impl CountingScope {
    pub fn claims(&self) -> usize {
        self.claims.load(Ordering::Relaxed)
    }
}

impl ServiceScope for CountingScope {
    fn claim_clients(&self) {
        self.claims.fetch_add(1, Ordering::Relaxed);
    }
}
