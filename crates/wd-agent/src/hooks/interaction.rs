// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! User interaction capture: clicks on interactive elements, form
//! submissions, history traversal. All listeners are passive — nothing here
//! blocks or alters the host's default handling.

use serde_json::{Map, Value};
use wd_proto::{sanitize_message, EventKind};

use crate::agent::WatchdogAgent;
use crate::config::LABEL_MAX_LEN;

/// Element tags treated as interactive in their own right.
const INTERACTIVE_TAGS: [&str; 4] = ["button", "a", "input", "select"];

/// Snapshot of the element a click landed on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClickTarget {
    /// Lower-case tag name
    pub tag: String,
    /// Recognised action marker carried by the element
    pub action: Option<String>,
    pub name: Option<String>,
    pub id: Option<String>,
    /// Visible text content
    pub text: Option<String>,
    /// Whether the element sits inside a button-like container
    pub in_button_like: bool,
}

impl ClickTarget {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Clicks on elements that are not interactive are ignored.
    pub fn is_interactive(&self) -> bool {
        INTERACTIVE_TAGS.contains(&self.tag.as_str())
            || self.action.is_some()
            || self.in_button_like
    }

    /// Best-effort label: action marker, then name, then id, then trimmed
    /// text content. Bounded.
    pub fn label(&self) -> Option<String> {
        self.action
            .clone()
            .or_else(|| self.name.clone())
            .or_else(|| self.id.clone())
            .or_else(|| {
                self.text
                    .as_ref()
                    .map(|text| text.trim().to_string())
                    .filter(|text| !text.is_empty())
            })
            .map(|label| sanitize_message(&label, LABEL_MAX_LEN))
    }
}

/// A form submission as seen by the submit channel.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FormSubmit {
    pub form_id: Option<String>,
    pub name: Option<String>,
    /// Submission endpoint
    pub action: String,
    pub method: String,
}

/// Direction of a captured navigation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NavigationKind {
    /// Programmatic history push
    Push,
    /// Programmatic history replace
    Replace,
    /// Back/forward traversal
    Pop,
}

impl NavigationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationKind::Push => "push",
            NavigationKind::Replace => "replace",
            NavigationKind::Pop => "pop",
        }
    }
}

/// Passive observer over the host's interaction channels.
pub trait InteractionSink: Send + Sync {
    fn click(&self, target: &ClickTarget);

    fn form_submit(&self, submit: &FormSubmit);

    /// Back/forward traversal landed on `path`.
    fn history_pop(&self, path: &str);
}

impl InteractionSink for WatchdogAgent {
    fn click(&self, target: &ClickTarget) {
        if !target.is_interactive() {
            return;
        }
        let mut data = Map::new();
        data.insert("tag".into(), Value::String(target.tag.clone()));
        if let Some(id) = &target.id {
            data.insert("id".into(), Value::String(id.clone()));
        }
        let label = target.label().unwrap_or_else(|| format!("<{}>", target.tag));
        self.log(EventKind::UserClick, label, data);
    }

    fn form_submit(&self, submit: &FormSubmit) {
        let endpoint = sanitize_message(&submit.action, LABEL_MAX_LEN);
        let mut data = Map::new();
        if let Some(form_id) = &submit.form_id {
            data.insert("formId".into(), Value::String(form_id.clone()));
        }
        if let Some(name) = &submit.name {
            data.insert("name".into(), Value::String(name.clone()));
        }
        data.insert("action".into(), Value::String(endpoint.clone()));
        data.insert(
            "method".into(),
            Value::String(submit.method.to_uppercase()),
        );
        self.log(EventKind::FormSubmit, format!("submit {}", endpoint), data);
    }

    fn history_pop(&self, path: &str) {
        self.record_navigation(path, NavigationKind::Pop);
    }
}
