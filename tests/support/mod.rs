#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use portal_api_types::SubunitScoped;
use portal_sync::application::reference::{ReferenceData, ReferenceItem};
use portal_sync::application::{
    AggregationContext, BackendError, Backends, ContentSource, ReferenceCache, ReferenceSource,
    RetryPolicy, SubunitSource,
};
use portal_sync::cache::CacheScope;
use portal_sync::domain::content::ContentItem;
use portal_sync::domain::entities::{
    DocumentRecord, EventRecord, GroupRecord, ImageRecord, MessageRecord, NewsRecord,
    PositionRecord, SubunitRecord, UserRecord, VideoRecord, WorkLocationRecord,
};
use portal_sync::domain::types::{ReferenceKind, SubunitKind};
use serde_json::Value;
use time::OffsetDateTime;
use time::macros::datetime;
use tokio::sync::Semaphore;

pub const SECTOR_A: &str = "sector-a";
pub const SECTOR_B: &str = "sector-b";

pub type Table<T> = Mutex<HashMap<String, Vec<T>>>;

/// In-memory content service with per-endpoint call counters, injectable
/// failures and gates that hold every per-subunit read until released.
#[derive(Default)]
pub struct FakeBackend {
    subunits: Mutex<HashMap<String, SubunitRecord>>,
    news: Table<NewsRecord>,
    events: Table<EventRecord>,
    documents: Table<DocumentRecord>,
    videos: Table<VideoRecord>,
    images: Table<ImageRecord>,
    messages: Table<MessageRecord>,
    reference: Mutex<HashMap<ReferenceKind, ReferenceData>>,
    calls: Mutex<HashMap<String, usize>>,
    failures: Mutex<HashMap<String, BackendError>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    stalls: Mutex<HashMap<String, Arc<Semaphore>>>,
    next_id: AtomicU32,
}

impl FakeBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Two sectors with no content and one entry per reference kind.
    pub fn seeded() -> Arc<Self> {
        let backend = Self::new();
        backend.add_subunit(SECTOR_A, "Sector A");
        backend.add_subunit(SECTOR_B, "Sector B");
        backend.set_reference(ReferenceData::Users(Arc::new(vec![user("u1")])));
        backend.set_reference(ReferenceData::Groups(Arc::new(vec![group("g1")])));
        backend.set_reference(ReferenceData::WorkLocations(Arc::new(vec![
            WorkLocationRecord {
                id: "w1".to_string(),
                name: "Head office".to_string(),
            },
        ])));
        backend.set_reference(ReferenceData::Positions(Arc::new(vec![PositionRecord {
            id: "p1".to_string(),
            name: "Coordinator".to_string(),
        }])));
        backend
    }

    pub fn add_subunit(&self, id: &str, name: &str) {
        self.subunits.lock().unwrap().insert(
            id.to_string(),
            SubunitRecord {
                id: id.to_string(),
                name: name.to_string(),
                kind: SubunitKind::Sector,
                parent_id: None,
                description: None,
            },
        );
    }

    pub fn put<T: Stored>(&self, subunit_id: &str, items: Vec<T>) {
        T::table(self)
            .lock()
            .unwrap()
            .insert(subunit_id.to_string(), items);
    }

    pub fn set_reference(&self, data: ReferenceData) {
        self.reference.lock().unwrap().insert(data.kind(), data);
    }

    /// Number of calls made to `endpoint`, e.g. `list:news` or `reference:users`.
    pub fn calls(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(endpoint)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    pub fn fail(&self, endpoint: &str, error: BackendError) {
        self.failures
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), error);
    }

    pub fn heal(&self, endpoint: &str) {
        self.failures.lock().unwrap().remove(endpoint);
    }

    /// Hold every read for `subunit_id` until [`release`](Self::release).
    pub fn hold(&self, subunit_id: &str) {
        self.gates
            .lock()
            .unwrap()
            .insert(subunit_id.to_string(), Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, subunit_id: &str) {
        if let Some(gate) = self.gates.lock().unwrap().remove(subunit_id) {
            gate.close();
        }
    }

    /// Let the next `list` on `endpoint` read its data, then wait on the
    /// returned gate before answering.
    pub fn stall_after_read(&self, endpoint: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.stalls
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), Arc::clone(&gate));
        gate
    }

    async fn stall(&self, endpoint: &str) {
        let gate = self.stalls.lock().unwrap().remove(endpoint);
        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }
    }

    async fn enter(&self, endpoint: String, subunit_id: Option<&str>) -> Result<(), BackendError> {
        *self.calls.lock().unwrap().entry(endpoint.clone()).or_default() += 1;
        let gate = subunit_id.and_then(|id| self.gates.lock().unwrap().get(id).cloned());
        if let Some(gate) = gate {
            let _ = gate.acquire().await;
        }
        match self.failures.lock().unwrap().get(&endpoint) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn next_created_at(&self) -> OffsetDateTime {
        let step = self.next_id.fetch_add(1, Ordering::SeqCst);
        datetime!(2026-06-01 00:00 UTC) + Duration::from_secs(60 * u64::from(step))
    }
}

/// Maps a record type to its table inside [`FakeBackend`].
pub trait Stored: ContentItem {
    fn table(backend: &FakeBackend) -> &Table<Self>;
}

macro_rules! stored {
    ($record:ty, $field:ident) => {
        impl Stored for $record {
            fn table(backend: &FakeBackend) -> &Table<Self> {
                &backend.$field
            }
        }
    };
}

stored!(NewsRecord, news);
stored!(EventRecord, events);
stored!(DocumentRecord, documents);
stored!(VideoRecord, videos);
stored!(ImageRecord, images);
stored!(MessageRecord, messages);

#[async_trait]
impl SubunitSource for FakeBackend {
    async fn fetch(&self, subunit_id: &str) -> Result<SubunitRecord, BackendError> {
        self.enter("subunit".to_string(), Some(subunit_id)).await?;
        self.subunits
            .lock()
            .unwrap()
            .get(subunit_id)
            .cloned()
            .ok_or(BackendError::NotFound)
    }
}

#[async_trait]
impl<T: Stored> ContentSource<T> for FakeBackend {
    async fn list(&self, subunit_id: &str) -> Result<Vec<T>, BackendError> {
        let endpoint = format!("list:{}", T::KIND);
        self.enter(endpoint.clone(), Some(subunit_id)).await?;
        let items = T::table(self)
            .lock()
            .unwrap()
            .get(subunit_id)
            .cloned()
            .unwrap_or_default();
        self.stall(&endpoint).await;
        Ok(items)
    }

    async fn create(&self, payload: &T::Create) -> Result<T, BackendError> {
        self.enter(format!("create:{}", T::KIND), None).await?;
        let mut value = serde_json::to_value(payload).map_err(BackendError::decode)?;
        let created_at = self
            .next_created_at()
            .format(&time::format_description::well_known::Rfc3339)
            .map_err(BackendError::decode)?;
        if let Some(object) = value.as_object_mut() {
            let id = format!("{}-{}", T::KIND, self.next_id.fetch_add(1, Ordering::SeqCst));
            object.insert("id".to_string(), Value::String(id));
            object.insert("created_at".to_string(), Value::String(created_at));
        }
        let item: T = serde_json::from_value(value).map_err(BackendError::decode)?;
        T::table(self)
            .lock()
            .unwrap()
            .entry(payload.subunit_id().to_string())
            .or_default()
            .push(item.clone());
        Ok(item)
    }

    async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, BackendError> {
        self.enter(format!("update:{}", T::KIND), None).await?;
        let changes = serde_json::to_value(patch).map_err(BackendError::decode)?;
        let mut table = T::table(self).lock().unwrap();
        let item = table
            .values_mut()
            .flat_map(|items| items.iter_mut())
            .find(|item| item.id() == id)
            .ok_or(BackendError::NotFound)?;
        let mut value = serde_json::to_value(&*item).map_err(BackendError::decode)?;
        if let (Some(target), Some(changes)) = (value.as_object_mut(), changes.as_object()) {
            for (key, change) in changes {
                target.insert(key.clone(), change.clone());
            }
        }
        *item = serde_json::from_value(value).map_err(BackendError::decode)?;
        Ok(item.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), BackendError> {
        self.enter(format!("delete:{}", T::KIND), None).await?;
        let mut table = T::table(self).lock().unwrap();
        let before: usize = table.values().map(Vec::len).sum();
        table
            .values_mut()
            .for_each(|items| items.retain(|item| item.id() != id));
        let after: usize = table.values().map(Vec::len).sum();
        if before == after {
            return Err(BackendError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl<R: ReferenceItem> ReferenceSource<R> for FakeBackend {
    async fn list(&self) -> Result<Vec<R>, BackendError> {
        self.enter(format!("reference:{}", R::KIND), None).await?;
        let data = self.reference.lock().unwrap().get(&R::KIND).cloned();
        Ok(data
            .and_then(R::unwrap)
            .map(|items| items.to_vec())
            .unwrap_or_default())
    }
}

pub fn no_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        ..RetryPolicy::default()
    }
}

pub fn reference_cache() -> Arc<ReferenceCache> {
    Arc::new(ReferenceCache::new(Duration::from_secs(300)))
}

pub fn context(backend: &Arc<FakeBackend>) -> AggregationContext {
    context_with(backend, reference_cache(), CacheScope::Global)
}

pub fn context_with(
    backend: &Arc<FakeBackend>,
    cache: Arc<ReferenceCache>,
    scope: CacheScope,
) -> AggregationContext {
    AggregationContext::new(
        Backends::from_shared(Arc::clone(backend)),
        no_retry(),
        cache,
        scope,
    )
}

fn stamp(minutes: i64) -> OffsetDateTime {
    datetime!(2026-01-01 09:00 UTC) + time::Duration::minutes(minutes)
}

pub fn news(id: &str, subunit_id: &str, published: bool, minutes: i64) -> NewsRecord {
    NewsRecord {
        id: id.to_string(),
        subunit_id: subunit_id.to_string(),
        title: format!("News {id}"),
        summary: None,
        body: "Body".to_string(),
        image_url: None,
        is_published: published,
        is_featured: false,
        created_at: stamp(minutes),
    }
}

pub fn event(id: &str, subunit_id: &str, published: bool, minutes: i64) -> EventRecord {
    EventRecord {
        id: id.to_string(),
        subunit_id: subunit_id.to_string(),
        title: format!("Event {id}"),
        description: None,
        location: "Main hall".to_string(),
        starts_at: stamp(minutes + 24 * 60),
        ends_at: None,
        image_url: None,
        is_published: published,
        is_featured: false,
        created_at: stamp(minutes),
    }
}

pub fn user(id: &str) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        name: format!("User {id}"),
        email: format!("{id}@portal.example"),
        position_id: None,
        work_location_id: None,
    }
}

pub fn group(id: &str) -> GroupRecord {
    GroupRecord {
        id: id.to_string(),
        name: format!("Group {id}"),
        description: None,
        member_ids: Vec::new(),
    }
}
