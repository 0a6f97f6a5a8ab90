// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Page location seam. Every entry records the path the page was on when the
//! event was captured.

/// Provider of the current page path.
pub trait PageLocation: Send + Sync {
    /// Path component of the page location, e.g. `/venues/edit`.
    fn path(&self) -> String;
}

/// Fixed path, for hosts without router integration and for tests.
#[derive(Clone, Debug)]
pub struct StaticLocation(String);

impl StaticLocation {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn root() -> Self {
        Self::new("/")
    }
}

impl PageLocation for StaticLocation {
    fn path(&self) -> String {
        self.0.clone()
    }
}
