// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests for the capture → queue → flush pipeline against a fake
//! host runtime: init deferral and idempotence, per-channel fault tolerance,
//! flush scheduling and lifecycle-forced flushes.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Map;
use wd_agent::hooks::{ConsoleApi, HistoryApi, LifecycleSink};
use wd_agent::test_utils::{MockHost, RecordingTransport};
use wd_agent::{AgentHandle, EventKind, WatchdogAgent};

fn init_tracing() {
    let _ = wd_logging::init(
        "wd-agent-tests",
        wd_logging::Level::DEBUG,
        wd_logging::LogFormat::Plaintext,
    );
}

fn build_agent(transport: &Arc<RecordingTransport>) -> AgentHandle {
    WatchdogAgent::builder(Arc::clone(transport) as _).build()
}

#[tokio::test]
async fn init_installs_every_channel_and_emits_client_init() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let agent = build_agent(&transport);
    let mut host = MockHost::new();

    agent.init(&mut host);

    assert_eq!(
        host.installed_channels(),
        [
            "uncaught-errors",
            "interaction",
            "performance",
            "lifecycle",
            "console",
            "fetch",
            "history"
        ]
    );
    assert_eq!(agent.queue_len(), 1);

    agent.flush_logs();
    let batches = transport.batches();
    assert_eq!(batches[0].logs[0].event_type, EventKind::ClientInit);
}

#[tokio::test]
async fn init_defers_until_the_document_is_ready() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let agent = build_agent(&transport);
    let mut host = MockHost::not_ready();

    agent.init(&mut host);
    assert!(host.installed_channels().is_empty());
    assert_eq!(agent.queue_len(), 0);

    host.make_ready();
    assert_eq!(host.installed_channels().len(), 7);
    assert_eq!(agent.queue_len(), 1);
}

#[tokio::test]
async fn init_is_idempotent() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let agent = build_agent(&transport);
    let mut host = MockHost::new();

    agent.init(&mut host);
    agent.init(&mut host);

    // Channels installed once, one CLIENT_INIT entry.
    assert_eq!(host.installed_channels().len(), 7);
    assert_eq!(agent.queue_len(), 1);
}

#[tokio::test]
async fn one_failing_installer_does_not_disable_the_others() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let agent = build_agent(&transport);
    let mut host = MockHost::new()
        .without_channel("performance")
        .without_channel("console");

    agent.init(&mut host);

    assert_eq!(
        host.installed_channels(),
        ["uncaught-errors", "interaction", "lifecycle", "fetch", "history"]
    );

    // The console stayed unwrapped: using it produces no telemetry.
    host.console().error("not captured");
    agent.flush_logs();
    let captured: Vec<EventKind> = transport
        .batches()
        .into_iter()
        .flat_map(|batch| batch.logs)
        .map(|entry| entry.event_type)
        .collect();
    assert_eq!(captured, [EventKind::ClientInit]);
}

#[tokio::test]
async fn wrapped_console_still_reaches_the_original_through_the_host() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let agent = build_agent(&transport);
    let mut host = MockHost::new();
    agent.init(&mut host);

    host.console().error("template render failed");
    host.history().push_state("/venues/7");

    agent.flush_logs();
    let kinds: Vec<EventKind> = transport
        .batches()
        .into_iter()
        .flat_map(|batch| batch.logs)
        .map(|entry| entry.event_type)
        .collect();
    assert_eq!(
        kinds,
        [
            EventKind::ClientInit,
            EventKind::ConsoleError,
            EventKind::Navigation
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn periodic_timer_flushes_on_schedule() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let agent = build_agent(&transport);
    let mut host = MockHost::new();
    agent.init(&mut host);

    agent.log(EventKind::UserClick, "save", Map::new());
    assert_eq!(agent.queue_len(), 2);

    // Just under the flush interval: nothing has been sent.
    tokio::time::sleep(Duration::from_millis(4900)).await;
    assert!(transport.batches().is_empty());

    // Crossing the interval flushes everything queued so far.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].len(), 2);
    assert_eq!(agent.queue_len(), 0);
}

#[tokio::test]
async fn before_unload_appends_page_unload_and_flushes_one_batch() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let agent = build_agent(&transport);

    agent.log(EventKind::UserClick, "export", Map::new());
    agent.before_unload();

    let batches = transport.batches();
    assert_eq!(batches.len(), 1);
    let kinds: Vec<EventKind> =
        batches[0].logs.iter().map(|entry| entry.event_type).collect();
    assert_eq!(kinds, [EventKind::UserClick, EventKind::PageUnload]);
}

#[tokio::test]
async fn visibility_hidden_forces_a_flush() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let agent = build_agent(&transport);

    agent.log(EventKind::CustomEvent, "draft-saved", Map::new());
    agent.visibility_hidden();

    assert_eq!(transport.batches().len(), 1);
    assert_eq!(agent.queue_len(), 0);

    // Hidden with nothing queued stays silent.
    agent.visibility_hidden();
    assert_eq!(transport.batches().len(), 1);
}

#[tokio::test]
async fn keepalive_fallback_is_taken_when_the_beacon_is_unavailable() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::without_beacon());
    let agent = build_agent(&transport);

    agent.log(EventKind::ManualError, "fallback please", Map::new());
    agent.flush_logs();

    // The fallback send runs on a spawned task.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.keepalive_sends(), 1);
    assert_eq!(transport.batches().len(), 1);
}

#[tokio::test]
async fn stats_reflect_the_pipeline() {
    init_tracing();
    let transport = Arc::new(RecordingTransport::new());
    let agent = build_agent(&transport);

    agent.set_enabled(false);
    agent.log(EventKind::UserClick, "dropped", Map::new());
    agent.set_enabled(true);

    for i in 0..agent.config().max_queue_size {
        agent.log(EventKind::UserClick, format!("c{}", i), Map::new());
    }
    agent.log(EventKind::UserClick, "tail", Map::new());
    agent.flush_logs();

    let stats = agent.stats();
    assert_eq!(stats.entries_dropped, 1);
    assert_eq!(stats.entries_captured, agent.config().max_queue_size as u64 + 1);
    assert_eq!(stats.eager_flushes, 1);
    assert_eq!(stats.batches_dispatched, 2);
}
