// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Watchdog Telemetry Protocol — record and batch schemas
//!
//! This crate defines the message schemas exchanged between the client-side
//! watchdog agent and the log ingestion endpoint. A batch is one JSON object
//! with a single `logs` field holding the captured entries in FIFO order.
//!
//! Field names on the wire are camelCase; event kinds are serialized as
//! SCREAMING_SNAKE_CASE tags.

pub mod entries;

// Re-export key types
pub use entries::{EventKind, LogBatch, LogEntry};

/// MIME type of an encoded batch.
pub const BATCH_CONTENT_TYPE: &str = "application/json";

// JSON encoding/decoding functions for batch transmission
pub fn encode_batch(batch: &LogBatch) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(batch)
}

pub fn decode_batch(data: &[u8]) -> Result<LogBatch, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Bound a string sourced from unbounded content: truncate to `max_len`
/// characters and replace CR/LF with spaces, matching the ingestion side's
/// sanitizer.
pub fn sanitize_message(text: &str, max_len: usize) -> String {
    text.chars()
        .take(max_len)
        .map(|ch| if matches!(ch, '\n' | '\r') { ' ' } else { ch })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use serde_json::Value;

    #[test]
    fn batch_uses_wire_field_names() {
        let entry = LogEntry::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            "session-1",
            EventKind::JsError,
            "boom",
            serde_json::Map::new(),
            "/hotels",
        );
        let batch = LogBatch { logs: vec![entry] };

        let encoded = encode_batch(&batch).unwrap();
        let value: Value = serde_json::from_slice(&encoded).unwrap();

        let entry = &value["logs"][0];
        assert_eq!(entry["sessionId"], "session-1");
        assert_eq!(entry["eventType"], "JS_ERROR");
        assert_eq!(entry["message"], "boom");
        assert_eq!(entry["url"], "/hotels");
        assert!(entry["data"].as_object().unwrap().is_empty());
    }

    #[test]
    fn event_kinds_serialize_as_screaming_snake_case() {
        for (kind, tag) in [
            (EventKind::ClientInit, "\"CLIENT_INIT\""),
            (EventKind::PromiseRejection, "\"PROMISE_REJECTION\""),
            (EventKind::ConsoleWarn, "\"CONSOLE_WARN\""),
            (EventKind::SlowPageLoad, "\"SLOW_PAGE_LOAD\""),
            (EventKind::PageUnload, "\"PAGE_UNLOAD\""),
            (EventKind::ManualError, "\"MANUAL_ERROR\""),
        ] {
            assert_eq!(serde_json::to_string(&kind).unwrap(), tag);
        }
    }

    #[test]
    fn sanitize_strips_newlines_and_truncates() {
        assert_eq!(sanitize_message("line1\nline2\r\n", 500), "line1 line2  ");
        assert_eq!(sanitize_message("abcdef", 3), "abc");
        // Truncation must not split a multi-byte character.
        assert_eq!(sanitize_message("héllo", 2), "hé");
    }

    #[test]
    fn decode_accepts_missing_data_field() {
        let raw = br#"{"logs":[{"timestamp":"2025-06-01T12:00:00Z","sessionId":"s","eventType":"USER_CLICK","message":"save","url":"/"}]}"#;
        let batch = decode_batch(raw).unwrap();
        assert_eq!(batch.logs.len(), 1);
        assert!(batch.logs[0].data.is_empty());
    }
}
