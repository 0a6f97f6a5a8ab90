// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! History channel decorator: programmatic route changes are captured as
//! `NAVIGATION` entries and forwarded unchanged. Back/forward traversal
//! arrives through the interaction sink instead, since the host observes it
//! as an event rather than a call.

use crate::agent::AgentHandle;
use crate::hooks::interaction::NavigationKind;

/// The host's history capability.
pub trait HistoryApi: Send + Sync {
    fn push_state(&self, path: &str);
    fn replace_state(&self, path: &str);
}

impl<H: HistoryApi + ?Sized> HistoryApi for Box<H> {
    fn push_state(&self, path: &str) {
        (**self).push_state(path)
    }

    fn replace_state(&self, path: &str) {
        (**self).replace_state(path)
    }
}

/// Decorator over a [`HistoryApi`].
pub struct InstrumentedHistory<H> {
    inner: H,
    agent: AgentHandle,
}

impl<H: HistoryApi> InstrumentedHistory<H> {
    pub fn new(inner: H, agent: AgentHandle) -> Self {
        Self { inner, agent }
    }

    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: HistoryApi> HistoryApi for InstrumentedHistory<H> {
    fn push_state(&self, path: &str) {
        self.agent.record_navigation(path, NavigationKind::Push);
        self.inner.push_state(path);
    }

    fn replace_state(&self, path: &str) {
        self.agent.record_navigation(path, NavigationKind::Replace);
        self.inner.replace_state(path);
    }
}

/// Wrap `history`; the call site substitutes the returned value.
pub fn instrument_history<H: HistoryApi>(history: H, agent: AgentHandle) -> InstrumentedHistory<H> {
    InstrumentedHistory::new(history, agent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::WatchdogAgent;
    use crate::test_utils::{RecordingHistory, RecordingTransport};
    use std::sync::Arc;
    use wd_proto::EventKind;

    #[test]
    fn push_state_is_captured_and_forwarded() {
        let transport = Arc::new(RecordingTransport::new());
        let agent = WatchdogAgent::builder(Arc::clone(&transport) as _).build();
        let history = instrument_history(RecordingHistory::default(), Arc::clone(&agent));

        history.push_state("/hotels/12");
        history.replace_state("/hotels/12?tab=rooms");

        let original = history.into_inner();
        assert_eq!(
            original.calls(),
            vec![
                ("push".to_string(), "/hotels/12".to_string()),
                ("replace".to_string(), "/hotels/12?tab=rooms".to_string()),
            ]
        );

        agent.flush_logs();
        let batches = transport.batches();
        assert_eq!(batches[0].len(), 2);
        assert!(batches[0]
            .logs
            .iter()
            .all(|entry| entry.event_type == EventKind::Navigation));
        assert_eq!(batches[0].logs[0].data["kind"], "push");
        assert_eq!(batches[0].logs[1].data["kind"], "replace");
    }
}
