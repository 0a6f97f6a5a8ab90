// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Performance signals: long main-thread tasks, slow resource fetches and
//! page-load milestones. The agent filters against its configured thresholds,
//! so hosts may forward every observation unfiltered.

use std::time::Duration;

use serde_json::{Map, Value};
use wd_proto::EventKind;

use crate::agent::WatchdogAgent;

/// Timing for one fetched resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceTiming {
    /// Resource URL
    pub name: String,
    pub duration: Duration,
}

/// Page load milestones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageLoadTiming {
    /// Time to full load
    pub total: Duration,
    /// Time to DOM ready
    pub dom_ready: Duration,
}

/// Observer over the host's performance observation channel.
pub trait PerformanceSink: Send + Sync {
    /// A main-thread task ran for `duration`.
    fn long_task(&self, duration: Duration);

    fn resource(&self, timing: &ResourceTiming);

    /// The page finished loading.
    fn page_load(&self, timing: &PageLoadTiming);
}

impl PerformanceSink for WatchdogAgent {
    fn long_task(&self, duration: Duration) {
        if duration < self.config().long_task_threshold {
            return;
        }
        let mut data = Map::new();
        data.insert("durationMs".into(), Value::from(duration.as_millis() as u64));
        let message = format!("main thread task took {}ms", duration.as_millis());
        self.log(EventKind::LongTask, message, data);
    }

    fn resource(&self, timing: &ResourceTiming) {
        if timing.duration <= self.config().slow_resource_threshold {
            return;
        }
        let mut data = Map::new();
        data.insert("name".into(), Value::String(timing.name.clone()));
        data.insert(
            "durationMs".into(),
            Value::from(timing.duration.as_millis() as u64),
        );
        self.log(EventKind::SlowResource, &timing.name, data);
    }

    fn page_load(&self, timing: &PageLoadTiming) {
        let mut data = Map::new();
        data.insert("loadMs".into(), Value::from(timing.total.as_millis() as u64));
        data.insert(
            "domReadyMs".into(),
            Value::from(timing.dom_ready.as_millis() as u64),
        );
        let message = format!("page loaded in {}ms", timing.total.as_millis());
        self.log(EventKind::PageLoad, &message, data.clone());

        if timing.total > self.config().slow_page_load_threshold {
            self.log(EventKind::SlowPageLoad, message, data);
        }
    }
}
