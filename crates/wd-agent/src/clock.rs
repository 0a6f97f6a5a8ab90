// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Capture-time clock seam.

use chrono::{DateTime, Utc};

/// Source of capture timestamps.
///
/// Injected explicitly so tests can drive time; the agent clamps whatever the
/// clock returns so per-session timestamps never decrease.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
