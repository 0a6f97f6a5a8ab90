// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Global error channels: uncaught synchronous errors and unhandled
//! asynchronous rejections.

use serde_json::{Map, Value};
use wd_proto::{sanitize_message, EventKind};

use crate::agent::WatchdogAgent;
use crate::config::MESSAGE_MAX_LEN;

/// An uncaught synchronous error surfaced by the host's error channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptError {
    pub message: String,
    /// Source location (file or script URL)
    pub source: String,
    pub line: u32,
    pub column: u32,
    pub stack: Option<String>,
}

/// An unhandled asynchronous rejection. The reason is a best-effort string
/// coercion of whatever value the host saw.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Rejection {
    pub reason: String,
    pub stack: Option<String>,
}

impl Rejection {
    /// Coerce an arbitrary rejection value into a loggable reason.
    pub fn from_reason(reason: impl std::fmt::Display) -> Self {
        Self {
            reason: reason.to_string(),
            stack: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }
}

/// Observer over the host's global error channels.
pub trait ErrorSink: Send + Sync {
    /// Returns whether the error was handled. The agent always answers
    /// `false` so the host's default error reporting still runs.
    fn uncaught_error(&self, error: &ScriptError) -> bool;

    fn unhandled_rejection(&self, rejection: &Rejection);
}

impl ErrorSink for WatchdogAgent {
    fn uncaught_error(&self, error: &ScriptError) -> bool {
        let mut data = Map::new();
        data.insert("source".into(), Value::String(error.source.clone()));
        data.insert("line".into(), Value::from(error.line));
        data.insert("column".into(), Value::from(error.column));
        if let Some(stack) = &error.stack {
            data.insert(
                "stack".into(),
                Value::String(sanitize_message(stack, MESSAGE_MAX_LEN)),
            );
        }
        self.log(EventKind::JsError, &error.message, data);
        false
    }

    fn unhandled_rejection(&self, rejection: &Rejection) {
        let mut data = Map::new();
        if let Some(stack) = &rejection.stack {
            data.insert(
                "stack".into(),
                Value::String(sanitize_message(stack, MESSAGE_MAX_LEN)),
            );
        }
        self.log(EventKind::PromiseRejection, &rejection.reason, data);
    }
}
