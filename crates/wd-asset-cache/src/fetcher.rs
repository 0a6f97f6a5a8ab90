// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Network capability used to populate the cache.

use async_trait::async_trait;

use crate::storage::CachedResponse;
use crate::CacheError;

/// Fetches one asset and captures the full response.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, path: &str) -> Result<CachedResponse, CacheError>;
}

/// reqwest-backed fetcher resolving paths against a base URL.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, path: &str) -> Result<CachedResponse, CacheError> {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url.trim_end_matches('/'), path)
        };

        let response = self.client.get(&url).send().await.map_err(|err| {
            CacheError::Network {
                url: url.clone(),
                reason: err.to_string(),
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|err| CacheError::Network {
                url: url.clone(),
                reason: err.to_string(),
            })?
            .to_vec();

        Ok(CachedResponse {
            status,
            headers,
            body,
        })
    }
}
