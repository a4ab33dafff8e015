//! Cache-backed loaders for auxiliary reference data.
//!
//! Reference data is not owned by a subunit. A failed load leaves the prior
//! snapshot in place and is logged rather than surfaced.

use std::sync::{Arc, RwLock};

use serde::{Serialize, de::DeserializeOwned};
use tracing::warn;

use crate::application::backend::{BackendError, ReferenceSource};
use crate::application::error::{FailureScope, FetchFailure};
use crate::application::retry::RetryingFetcher;
use crate::cache::CacheStore;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::entities::{GroupRecord, PositionRecord, UserRecord, WorkLocationRecord};
use crate::domain::types::ReferenceKind;

const SOURCE: &str = "application::reference::ReferenceLoader";

/// Cached payload for one reference kind.
#[derive(Debug, Clone)]
pub enum ReferenceData {
    Users(Arc<Vec<UserRecord>>),
    Groups(Arc<Vec<GroupRecord>>),
    WorkLocations(Arc<Vec<WorkLocationRecord>>),
    Positions(Arc<Vec<PositionRecord>>),
}

impl ReferenceData {
    pub fn kind(&self) -> ReferenceKind {
        match self {
            ReferenceData::Users(_) => ReferenceKind::Users,
            ReferenceData::Groups(_) => ReferenceKind::Groups,
            ReferenceData::WorkLocations(_) => ReferenceKind::WorkLocations,
            ReferenceData::Positions(_) => ReferenceKind::Positions,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ReferenceData::Users(items) => items.len(),
            ReferenceData::Groups(items) => items.len(),
            ReferenceData::WorkLocations(items) => items.len(),
            ReferenceData::Positions(items) => items.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub type ReferenceCache = CacheStore<ReferenceKind, ReferenceData>;

pub trait ReferenceItem: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: ReferenceKind;

    fn wrap(items: Arc<Vec<Self>>) -> ReferenceData;

    fn unwrap(data: ReferenceData) -> Option<Arc<Vec<Self>>>;
}

macro_rules! reference_item {
    ($record:ty, $variant:ident) => {
        impl ReferenceItem for $record {
            const KIND: ReferenceKind = ReferenceKind::$variant;

            fn wrap(items: Arc<Vec<Self>>) -> ReferenceData {
                ReferenceData::$variant(items)
            }

            fn unwrap(data: ReferenceData) -> Option<Arc<Vec<Self>>> {
                match data {
                    ReferenceData::$variant(items) => Some(items),
                    _ => None,
                }
            }
        }
    };
}

reference_item!(UserRecord, Users);
reference_item!(GroupRecord, Groups);
reference_item!(WorkLocationRecord, WorkLocations);
reference_item!(PositionRecord, Positions);

/// Result of the network half of a reference load.
#[derive(Debug, Clone)]
pub struct ReferenceFetch<R> {
    pub items: Arc<Vec<R>>,
    /// False when the items came out of the cache.
    pub fresh: bool,
}

pub struct ReferenceLoader<R: ReferenceItem> {
    source: Arc<dyn ReferenceSource<R>>,
    fetcher: RetryingFetcher,
    snapshot: RwLock<Arc<Vec<R>>>,
}

impl<R: ReferenceItem> ReferenceLoader<R> {
    pub fn new(source: Arc<dyn ReferenceSource<R>>, fetcher: RetryingFetcher) -> Self {
        Self {
            source,
            fetcher,
            snapshot: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn kind(&self) -> ReferenceKind {
        R::KIND
    }

    /// Serve from the cache while fresh, otherwise hit the source.
    pub async fn fetch(&self, cache: &ReferenceCache) -> Result<ReferenceFetch<R>, BackendError> {
        if let Some(items) = cache.get(&R::KIND).and_then(R::unwrap) {
            return Ok(ReferenceFetch {
                items,
                fresh: false,
            });
        }
        let items = self
            .fetcher
            .execute(R::KIND.as_str(), || self.source.list())
            .await?;
        Ok(ReferenceFetch {
            items: Arc::new(items),
            fresh: true,
        })
    }

    /// Publish a fetch result. Freshly fetched items also replace the cache
    /// entry; failures keep the previous snapshot.
    pub fn apply(
        &self,
        cache: &ReferenceCache,
        result: Result<ReferenceFetch<R>, BackendError>,
    ) -> Option<FetchFailure> {
        match result {
            Ok(fetch) => {
                if fetch.fresh {
                    cache.set(R::KIND, R::wrap(Arc::clone(&fetch.items)));
                }
                *rw_write(&self.snapshot, SOURCE, "apply") = fetch.items;
                None
            }
            Err(err) => {
                warn!(
                    resource = %R::KIND,
                    error = %err,
                    "reference data unavailable, keeping previous snapshot"
                );
                Some(FetchFailure::new(FailureScope::Reference(R::KIND), &err))
            }
        }
    }

    pub async fn load(&self, cache: &ReferenceCache) -> Option<FetchFailure> {
        let result = self.fetch(cache).await;
        self.apply(cache, result)
    }

    pub fn items(&self) -> Arc<Vec<R>> {
        Arc::clone(&rw_read(&self.snapshot, SOURCE, "items"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::application::retry::RetryPolicy;

    #[derive(Default)]
    struct StubPositions {
        calls: AtomicUsize,
        failure: Mutex<Option<BackendError>>,
    }

    #[async_trait]
    impl ReferenceSource<PositionRecord> for StubPositions {
        async fn list(&self) -> Result<Vec<PositionRecord>, BackendError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if let Some(err) = self.failure.lock().unwrap().clone() {
                return Err(err);
            }
            Ok(vec![PositionRecord {
                id: format!("p{call}"),
                name: "Analyst".to_string(),
            }])
        }
    }

    fn loader(source: Arc<StubPositions>) -> ReferenceLoader<PositionRecord> {
        ReferenceLoader::new(
            source,
            RetryingFetcher::new(RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::default()
            }),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn cached_items_are_reused_within_ttl() {
        let source = Arc::new(StubPositions::default());
        let loader = loader(source.clone());
        let cache = ReferenceCache::new(Duration::from_secs(300));

        assert!(loader.load(&cache).await.is_none());
        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(loader.load(&cache).await.is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(loader.load(&cache).await.is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
        assert_eq!(loader.items()[0].id, "p2");
    }

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_previous_snapshot() {
        let source = Arc::new(StubPositions::default());
        let loader = loader(source.clone());
        let cache = ReferenceCache::new(Duration::from_secs(1));
        loader.load(&cache).await;

        tokio::time::advance(Duration::from_secs(5)).await;
        *source.failure.lock().unwrap() = Some(BackendError::Forbidden);
        let failure = loader.load(&cache).await.expect("load reports failure");

        assert_eq!(failure.scope, FailureScope::Reference(ReferenceKind::Positions));
        assert!(!failure.scope.is_primary());
        assert_eq!(loader.items().len(), 1);
    }

    #[test]
    fn unwrap_rejects_mismatched_variant() {
        let data = UserRecord::wrap(Arc::new(Vec::new()));
        assert_eq!(data.kind(), ReferenceKind::Users);
        assert!(PositionRecord::unwrap(data).is_none());
    }
}
