// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Fetch channel decorator: measures request duration and records slow or
//! failed outcomes. The wrapped backend's result always reaches the caller
//! unchanged — success, failure status and network errors alike.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::time::Instant;
use wd_proto::EventKind;

use crate::agent::AgentHandle;

/// Outgoing request as seen by the fetch channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
}

impl FetchRequest {
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

/// Response surfaced by the fetch channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            body: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network-level failure, before any response status exists.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("network failure for {url}: {reason}")]
pub struct FetchFailure {
    pub url: String,
    pub reason: String,
}

/// The host's network-fetch capability.
#[async_trait]
pub trait FetchBackend: Send + Sync {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchFailure>;
}

#[async_trait]
impl<F: FetchBackend + ?Sized> FetchBackend for Box<F> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchFailure> {
        (**self).fetch(request).await
    }
}

/// Decorator over a [`FetchBackend`]. One entry per noteworthy outcome:
/// `FETCH_ERROR` for a non-2xx status, `NETWORK_ERROR` for a failure before
/// a status exists, `SLOW_FETCH` for an over-threshold success.
pub struct InstrumentedFetch<F> {
    inner: F,
    agent: AgentHandle,
    slow_threshold: Duration,
}

impl<F: FetchBackend> InstrumentedFetch<F> {
    pub fn new(inner: F, agent: AgentHandle) -> Self {
        let slow_threshold = agent.config().slow_fetch_threshold;
        Self {
            inner,
            agent,
            slow_threshold,
        }
    }

    pub fn into_inner(self) -> F {
        self.inner
    }

    fn record(
        &self,
        request: &FetchRequest,
        result: &Result<FetchResponse, FetchFailure>,
        elapsed: Duration,
    ) {
        let mut data = Map::new();
        data.insert("url".into(), Value::String(request.url.clone()));
        data.insert("method".into(), Value::String(request.method.clone()));
        data.insert("durationMs".into(), Value::from(elapsed.as_millis() as u64));

        match result {
            Err(failure) => {
                self.agent.log(EventKind::NetworkError, &failure.reason, data);
            }
            Ok(response) if !response.is_success() => {
                data.insert("status".into(), Value::from(response.status));
                let message =
                    format!("{} {} -> {}", request.method, request.url, response.status);
                self.agent.log(EventKind::FetchError, message, data);
            }
            Ok(_) if elapsed > self.slow_threshold => {
                let message = format!(
                    "{} {} took {}ms",
                    request.method,
                    request.url,
                    elapsed.as_millis()
                );
                self.agent.log(EventKind::SlowFetch, message, data);
            }
            Ok(_) => {}
        }
    }
}

#[async_trait]
impl<F: FetchBackend> FetchBackend for InstrumentedFetch<F> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchFailure> {
        let started = Instant::now();
        let result = self.inner.fetch(request.clone()).await;
        self.record(&request, &result, started.elapsed());
        result
    }
}

/// Wrap `backend`; the call site substitutes the returned value.
pub fn instrument_fetch<F: FetchBackend>(backend: F, agent: AgentHandle) -> InstrumentedFetch<F> {
    InstrumentedFetch::new(backend, agent)
}
