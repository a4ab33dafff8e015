mod support;

use std::sync::Arc;
use std::time::Duration;

use portal_sync::application::{BackendError, LoadPhase};
use portal_sync::cache::CacheScope;

use support::{FakeBackend, SECTOR_A, SECTOR_B, context, context_with, reference_cache};

const TTL: Duration = Duration::from_secs(300);

#[tokio::test(start_paused = true)]
async fn reference_data_is_reused_across_loads_within_ttl() {
    let backend = FakeBackend::seeded();
    let ctx = context(&backend);

    ctx.load(SECTOR_A).await;
    ctx.load(SECTOR_B).await;
    assert_eq!(backend.calls("reference:users"), 1);
    assert_eq!(backend.calls("reference:work-locations"), 1);
    assert_eq!(ctx.users().len(), 1);

    tokio::time::advance(TTL + Duration::from_secs(1)).await;
    ctx.load(SECTOR_A).await;
    assert_eq!(backend.calls("reference:users"), 2);
    assert_eq!(backend.calls("reference:positions"), 2);
}

#[tokio::test(start_paused = true)]
async fn global_cache_is_shared_between_contexts() {
    let backend = FakeBackend::seeded();
    let cache = reference_cache();
    let first = context_with(&backend, Arc::clone(&cache), CacheScope::Global);
    let second = context_with(&backend, Arc::clone(&cache), CacheScope::Global);

    first.load(SECTOR_A).await;
    second.load(SECTOR_B).await;

    assert_eq!(backend.calls("reference:groups"), 1);
    assert_eq!(second.groups().len(), 1);
    assert_eq!(cache.len(), 4);
}

#[tokio::test(start_paused = true)]
async fn session_scope_drops_the_cache_on_subunit_switch() {
    let backend = FakeBackend::seeded();
    let ctx = context_with(&backend, reference_cache(), CacheScope::Session);

    ctx.load(SECTOR_A).await;
    ctx.load(SECTOR_A).await;
    assert_eq!(backend.calls("reference:users"), 1);

    ctx.load(SECTOR_B).await;
    assert_eq!(backend.calls("reference:users"), 2);
}

#[tokio::test(start_paused = true)]
async fn invalidation_forces_a_refetch() {
    let backend = FakeBackend::seeded();
    let ctx = context(&backend);

    ctx.load(SECTOR_A).await;
    ctx.invalidate_reference();
    ctx.load(SECTOR_A).await;

    assert_eq!(backend.calls("reference:users"), 2);
}

#[tokio::test(start_paused = true)]
async fn expired_entry_failure_keeps_the_previous_snapshot() {
    let backend = FakeBackend::seeded();
    let ctx = context(&backend);
    ctx.load(SECTOR_A).await;

    tokio::time::advance(TTL + Duration::from_secs(1)).await;
    backend.fail("reference:users", BackendError::from_status(500, "down"));
    ctx.load(SECTOR_A).await;

    assert_eq!(backend.calls("reference:users"), 2);
    assert_eq!(ctx.users().len(), 1);
    assert_eq!(ctx.phase(), LoadPhase::Ready);
    assert!(ctx.error().is_none());
}
