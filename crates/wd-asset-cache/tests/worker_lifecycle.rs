// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Integration tests for the worker lifecycle: all-or-nothing install,
//! generation purge on activation, and cache-first request handling.

use std::sync::Arc;

use wd_asset_cache::test_utils::{CountingScope, ScriptedFetcher};
use wd_asset_cache::{
    AssetCacheWorker, AssetRequest, CacheError, CacheGeneration, CacheStorage, CachedResponse,
    MemoryCacheStorage, WorkerConfig, WorkerPhase,
};

fn init_tracing() {
    let _ = wd_logging::init(
        "wd-asset-cache-tests",
        wd_logging::Level::DEBUG,
        wd_logging::LogFormat::Plaintext,
    );
}

const ASSETS: [&str; 3] = [
    "/static/css/app.css",
    "/static/js/forms.js",
    "/static/img/logo.png",
];

fn worker_with(
    storage: &Arc<MemoryCacheStorage>,
    fetcher: &Arc<ScriptedFetcher>,
    generation: &str,
) -> AssetCacheWorker {
    AssetCacheWorker::new(
        WorkerConfig::new(generation).with_precache(ASSETS),
        Arc::clone(storage) as Arc<dyn CacheStorage>,
        Arc::clone(fetcher) as _,
    )
}

fn serve_all(fetcher: &ScriptedFetcher) {
    for asset in ASSETS {
        fetcher.serve(asset, CachedResponse::ok(format!("content of {}", asset)));
    }
}

#[tokio::test]
async fn install_precaches_the_full_asset_set() {
    init_tracing();
    let storage = Arc::new(MemoryCacheStorage::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    serve_all(&fetcher);
    let worker = worker_with(&storage, &fetcher, "assets-v1");

    worker.install().await.unwrap();

    assert_eq!(worker.phase(), WorkerPhase::Waiting);
    let generation = storage.open("assets-v1").await.unwrap();
    for asset in ASSETS {
        assert!(generation.get(asset).await.unwrap().is_some(), "{} missing", asset);
    }
}

#[tokio::test]
async fn a_single_failed_fetch_fails_install_with_no_partial_generation() {
    init_tracing();
    let storage = Arc::new(MemoryCacheStorage::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    serve_all(&fetcher);
    fetcher.fail("/static/js/forms.js", "connection reset");
    let worker = worker_with(&storage, &fetcher, "assets-v1");

    let err = worker.install().await.unwrap_err();
    assert!(matches!(err, CacheError::Network { .. }));
    assert_eq!(worker.phase(), WorkerPhase::Installing);

    // Nothing was stored and the worker never intercepts.
    assert!(storage.names().await.unwrap().is_empty());
    let served = worker
        .handle_fetch(&AssetRequest::get("/static/css/app.css"))
        .await
        .unwrap();
    assert!(served.is_none());
}

#[tokio::test]
async fn a_non_success_precache_status_also_fails_install() {
    init_tracing();
    let storage = Arc::new(MemoryCacheStorage::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    serve_all(&fetcher);
    fetcher.serve("/static/img/logo.png", CachedResponse::with_status(500));
    let worker = worker_with(&storage, &fetcher, "assets-v1");

    let err = worker.install().await.unwrap_err();
    assert!(matches!(
        err,
        CacheError::PrecacheStatus { status: 500, .. }
    ));
    assert!(storage.names().await.unwrap().is_empty());
}

#[tokio::test]
async fn activate_purges_every_stale_generation_and_claims_pages() {
    init_tracing();
    let storage = Arc::new(MemoryCacheStorage::new());
    storage.open("assets-v1").await.unwrap();
    storage.open("assets-v2").await.unwrap();

    let fetcher = Arc::new(ScriptedFetcher::new());
    serve_all(&fetcher);
    let scope = Arc::new(CountingScope::default());
    let worker = worker_with(&storage, &fetcher, "assets-v3").with_scope(Arc::clone(&scope) as _);

    worker.install().await.unwrap();
    worker.activate().await.unwrap();

    assert_eq!(storage.names().await.unwrap(), ["assets-v3"]);
    assert_eq!(scope.claims(), 1);
    assert_eq!(worker.phase(), WorkerPhase::Active);
}

#[tokio::test]
async fn cache_hits_never_touch_the_network() {
    init_tracing();
    let storage = Arc::new(MemoryCacheStorage::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    serve_all(&fetcher);
    let worker = worker_with(&storage, &fetcher, "assets-v1");
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    let fetches_after_install = fetcher.calls().len();

    let served = worker
        .handle_fetch(&AssetRequest::get("/static/css/app.css"))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(served.body, b"content of /static/css/app.css");
    assert_eq!(fetcher.calls().len(), fetches_after_install);
}

#[tokio::test]
async fn a_miss_fetches_once_and_populates_the_cache_on_success() {
    init_tracing();
    let storage = Arc::new(MemoryCacheStorage::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    let worker = AssetCacheWorker::new(
        WorkerConfig::new("assets-v1"),
        Arc::clone(&storage) as Arc<dyn CacheStorage>,
        Arc::clone(&fetcher) as _,
    );
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    fetcher.serve("/static/js/lazy.js", CachedResponse::ok("lazy module"));

    let first = worker
        .handle_fetch(&AssetRequest::get("/static/js/lazy.js"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.body, b"lazy module");
    assert_eq!(fetcher.calls_for("/static/js/lazy.js"), 1);

    // The copy stored on the miss now serves the next request.
    let second = worker
        .handle_fetch(&AssetRequest::get("/static/js/lazy.js"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(second.body, b"lazy module");
    assert_eq!(fetcher.calls_for("/static/js/lazy.js"), 1);
}

#[tokio::test]
async fn non_success_responses_are_served_but_never_stored() {
    init_tracing();
    let storage = Arc::new(MemoryCacheStorage::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    let worker = AssetCacheWorker::new(
        WorkerConfig::new("assets-v1"),
        Arc::clone(&storage) as Arc<dyn CacheStorage>,
        Arc::clone(&fetcher) as _,
    );
    worker.install().await.unwrap();
    worker.activate().await.unwrap();

    // No script entry: the fetcher answers 404.
    let served = worker
        .handle_fetch(&AssetRequest::get("/static/img/missing.png"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(served.status, 404);

    // Not stored, so the next request fetches again.
    worker
        .handle_fetch(&AssetRequest::get("/static/img/missing.png"))
        .await
        .unwrap();
    assert_eq!(fetcher.calls_for("/static/img/missing.png"), 2);
}

#[tokio::test]
async fn non_get_and_non_static_requests_pass_through() {
    init_tracing();
    let storage = Arc::new(MemoryCacheStorage::new());
    let fetcher = Arc::new(ScriptedFetcher::new());
    serve_all(&fetcher);
    let worker = worker_with(&storage, &fetcher, "assets-v1");
    worker.install().await.unwrap();
    worker.activate().await.unwrap();
    let fetches_after_install = fetcher.calls().len();

    let post = worker
        .handle_fetch(&AssetRequest::new("POST", "/static/css/app.css"))
        .await
        .unwrap();
    let api = worker.handle_fetch(&AssetRequest::get("/api/history")).await.unwrap();

    assert!(post.is_none());
    assert!(api.is_none());
    assert_eq!(fetcher.calls().len(), fetches_after_install);
}
