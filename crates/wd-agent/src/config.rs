// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Agent configuration: compile-time defaults plus a builder-style override
//! surface for embedders and tests.

use std::time::Duration;

/// Ingestion endpoint path for telemetry batches.
pub const DEFAULT_ENDPOINT: &str = "/api/watchdog/log";

/// Interval between periodic queue flushes.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(5000);

/// Queue length that forces an eager flush, and the batch size cap.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 50;

/// Main-thread tasks at or above this duration are reported.
pub const DEFAULT_LONG_TASK_THRESHOLD: Duration = Duration::from_millis(100);

/// Resource fetches above this duration are reported.
pub const DEFAULT_SLOW_RESOURCE_THRESHOLD: Duration = Duration::from_millis(3000);

/// Instrumented fetches above this duration are reported.
pub const DEFAULT_SLOW_FETCH_THRESHOLD: Duration = Duration::from_millis(5000);

/// Page loads above this duration get an additional flagged entry.
pub const DEFAULT_SLOW_PAGE_LOAD_THRESHOLD: Duration = Duration::from_millis(5000);

/// Bound applied to entry messages sourced from unbounded content.
pub const MESSAGE_MAX_LEN: usize = 500;

/// Bound applied to click labels and form endpoints.
pub const LABEL_MAX_LEN: usize = 100;

/// Configuration for one agent instance.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Endpoint path the transport posts batches to
    pub endpoint: String,
    /// Period of the recurring flush timer
    pub flush_interval: Duration,
    /// Queue capacity; reaching it triggers an eager flush
    pub max_queue_size: usize,
    pub long_task_threshold: Duration,
    pub slow_resource_threshold: Duration,
    pub slow_fetch_threshold: Duration,
    pub slow_page_load_threshold: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            long_task_threshold: DEFAULT_LONG_TASK_THRESHOLD,
            slow_resource_threshold: DEFAULT_SLOW_RESOURCE_THRESHOLD,
            slow_fetch_threshold: DEFAULT_SLOW_FETCH_THRESHOLD,
            slow_page_load_threshold: DEFAULT_SLOW_PAGE_LOAD_THRESHOLD,
        }
    }
}

impl AgentConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size.max(1);
        self
    }

    pub fn with_slow_fetch_threshold(mut self, threshold: Duration) -> Self {
        self.slow_fetch_threshold = threshold;
        self
    }

    pub fn with_slow_resource_threshold(mut self, threshold: Duration) -> Self {
        self.slow_resource_threshold = threshold;
        self
    }

    pub fn with_long_task_threshold(mut self, threshold: Duration) -> Self {
        self.long_task_threshold = threshold;
        self
    }

    pub fn with_slow_page_load_threshold(mut self, threshold: Duration) -> Self {
        self.slow_page_load_threshold = threshold;
        self
    }
}
