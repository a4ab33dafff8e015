mod support;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use metrics_util::debugging::DebuggingRecorder;
use portal_sync::application::{
    AggregationContext, BackendError, Backends, LoadOutcome, RetryPolicy,
};
use portal_sync::cache::CacheScope;

use support::{FakeBackend, SECTOR_A, SECTOR_B, reference_cache};

#[tokio::test]
async fn load_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let backend = FakeBackend::seeded();
    let ctx = AggregationContext::new(
        Backends::from_shared(Arc::clone(&backend)),
        RetryPolicy {
            max_attempts: 2,
            base_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(1),
            ..RetryPolicy::default()
        },
        reference_cache(),
        CacheScope::Global,
    );

    // cache miss, then hit; retry followed by a final failure
    backend.fail("list:videos", BackendError::from_status(502, "bad gateway"));
    ctx.load(SECTOR_A).await;
    ctx.load(SECTOR_A).await;
    assert_eq!(backend.calls("list:videos"), 4);

    // superseded session
    backend.hold(SECTOR_A);
    let (first, _) = tokio::join!(ctx.load(SECTOR_A), async {
        while !ctx.is_loading() {
            tokio::task::yield_now().await;
        }
        let outcome = ctx.load(SECTOR_B).await;
        backend.release(SECTOR_A);
        outcome
    });
    assert!(matches!(first, LoadOutcome::Superseded));

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "portal_cache_hit_total",
        "portal_cache_miss_total",
        "portal_fetch_retry_total",
        "portal_fetch_failure_total",
        "portal_load_ms",
        "portal_session_superseded_total",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
