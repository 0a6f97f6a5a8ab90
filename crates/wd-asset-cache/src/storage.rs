// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Cache storage capability: named generations of captured responses.
//!
//! The storage is shared across every page served by the origin; only the
//! worker mutates it, and generation deletion is idempotent, so activation
//! needs no coordination beyond enumerate-then-delete.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::CacheError;

/// A captured response stored under a request path: status, headers, body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CachedResponse {
    /// A 200 response with the given body and no headers.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One named cache generation.
#[async_trait]
pub trait CacheGeneration: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<CachedResponse>, CacheError>;

    async fn put(&self, path: &str, response: CachedResponse) -> Result<(), CacheError>;
}

/// The host's cache storage: open, enumerate and delete named generations.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a generation, creating it if absent.
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheGeneration>, CacheError>;

    /// Names of every extant generation.
    async fn names(&self) -> Result<Vec<String>, CacheError>;

    /// Delete a generation wholesale. Idempotent; returns whether it existed.
    async fn delete(&self, name: &str) -> Result<bool, CacheError>;
}

/// In-process storage backing, one response map per generation.
#[derive(Default)]
pub struct MemoryCacheStorage {
    generations: Mutex<HashMap<String, Arc<MemoryGeneration>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[derive(Default)]
struct MemoryGeneration {
    entries: Mutex<HashMap<String, CachedResponse>>,
}

#[async_trait]
impl CacheGeneration for MemoryGeneration {
    async fn get(&self, path: &str) -> Result<Option<CachedResponse>, CacheError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Storage("generation lock poisoned".to_string()))?;
        Ok(entries.get(path).cloned())
    }

    async fn put(&self, path: &str, response: CachedResponse) -> Result<(), CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Storage("generation lock poisoned".to_string()))?;
        entries.insert(path.to_string(), response);
        Ok(())
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CacheGeneration>, CacheError> {
        let mut generations = self
            .generations
            .lock()
            .map_err(|_| CacheError::Storage("storage lock poisoned".to_string()))?;
        let generation = generations
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryGeneration::default()));
        Ok(Arc::clone(generation) as Arc<dyn CacheGeneration>)
    }

    async fn names(&self) -> Result<Vec<String>, CacheError> {
        let generations = self
            .generations
            .lock()
            .map_err(|_| CacheError::Storage("storage lock poisoned".to_string()))?;
        let mut names: Vec<String> = generations.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, CacheError> {
        let mut generations = self
            .generations
            .lock()
            .map_err(|_| CacheError::Storage("storage lock poisoned".to_string()))?;
        Ok(generations.remove(name).is_some())
    }
}
