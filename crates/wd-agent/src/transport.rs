// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Batch delivery primitives.
//!
//! Transmission is fire-and-forget on both paths: the agent tries the beacon
//! path first and falls back to an asynchronous keepalive request when the
//! beacon primitive is unavailable. Neither path's outcome reaches the host
//! page — delivery failures degrade to telemetry loss, never to backpressure.

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::trace;
use wd_proto::BATCH_CONTENT_TYPE;

/// Delivery primitive for encoded telemetry batches.
#[async_trait]
pub trait BatchTransport: Send + Sync {
    /// Hand the payload to a detached dispatcher that survives page teardown.
    /// Returns false when the primitive is unavailable, in which case the
    /// caller falls back to [`BatchTransport::send_keepalive`].
    fn send_beacon(&self, payload: &[u8]) -> bool;

    /// Asynchronous fallback delivery with keepalive semantics. The error is
    /// discarded by the caller and exists only for diagnostics.
    async fn send_keepalive(&self, payload: Vec<u8>) -> Result<()>;
}

/// HTTP transport posting batches to the ingestion endpoint.
///
/// The beacon path is a detached dispatcher task fed through an unbounded
/// channel; it keeps draining after the agent is gone, which is as close as a
/// plain HTTP client gets to outliving the page. When constructed outside an
/// async runtime the beacon path is unavailable and every dispatch takes the
/// keepalive fallback.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    beacon_tx: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

impl HttpTransport {
    /// Build a transport posting to `base_url` joined with `endpoint_path`.
    pub fn new(base_url: &str, endpoint_path: &str) -> Self {
        let client = reqwest::Client::new();
        let endpoint = format!("{}{}", base_url.trim_end_matches('/'), endpoint_path);

        let beacon_tx = match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
                let client = client.clone();
                let endpoint = endpoint.clone();
                handle.spawn(async move {
                    while let Some(payload) = rx.recv().await {
                        if let Err(err) = post_batch(&client, &endpoint, payload).await {
                            trace!(error = %err, "beacon batch lost");
                        }
                    }
                });
                Some(tx)
            }
            Err(_) => None,
        };

        Self {
            client,
            endpoint,
            beacon_tx,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl BatchTransport for HttpTransport {
    fn send_beacon(&self, payload: &[u8]) -> bool {
        match &self.beacon_tx {
            Some(tx) => tx.send(payload.to_vec()).is_ok(),
            None => false,
        }
    }

    async fn send_keepalive(&self, payload: Vec<u8>) -> Result<()> {
        post_batch(&self.client, &self.endpoint, payload).await
    }
}

async fn post_batch(client: &reqwest::Client, endpoint: &str, payload: Vec<u8>) -> Result<()> {
    client
        .post(endpoint)
        .header(reqwest::header::CONTENT_TYPE, BATCH_CONTENT_TYPE)
        .body(payload)
        .send()
        .await
        .with_context(|| format!("failed to post telemetry batch to {}", endpoint))?;
    Ok(())
}
