//! Everything the context holds for the currently loaded subunit.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::warn;

use crate::application::backend::{BackendError, Backends, ContentSource, SubunitSource};
use crate::application::error::{FailureScope, FetchFailure};
use crate::application::reference::{ReferenceCache, ReferenceLoader};
use crate::application::repository::ContentRepository;
use crate::application::retry::RetryingFetcher;
use crate::application::visibility::DraftVisibilityController;
use crate::cache::CacheScope;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::content::ContentItem;
use crate::domain::entities::{
    DocumentRecord, EventRecord, GroupRecord, ImageRecord, MessageRecord, NewsRecord,
    PositionRecord, SubunitRecord, UserRecord, VideoRecord, WorkLocationRecord,
};
use crate::domain::types::{ContentKind, ReferenceKind};

const SOURCE: &str = "application::state::SubunitSlot";

#[derive(Default)]
struct SubunitSlotState {
    record: Option<SubunitRecord>,
    error: Option<FetchFailure>,
}

/// Metadata of the loaded subunit.
pub struct SubunitSlot {
    source: Arc<dyn SubunitSource>,
    fetcher: RetryingFetcher,
    state: RwLock<SubunitSlotState>,
}

impl SubunitSlot {
    pub fn new(source: Arc<dyn SubunitSource>, fetcher: RetryingFetcher) -> Self {
        Self {
            source,
            fetcher,
            state: RwLock::new(SubunitSlotState::default()),
        }
    }

    pub async fn fetch(&self, subunit_id: &str) -> Result<SubunitRecord, BackendError> {
        self.fetcher
            .execute("subunit", || self.source.fetch(subunit_id))
            .await
    }

    pub fn apply(&self, result: Result<SubunitRecord, BackendError>) -> Option<FetchFailure> {
        let mut state = rw_write(&self.state, SOURCE, "apply");
        match result {
            Ok(record) => {
                state.record = Some(record);
                state.error = None;
                None
            }
            Err(err) => {
                let failure = FetchFailure::new(FailureScope::Subunit, &err);
                state.error = Some(failure.clone());
                Some(failure)
            }
        }
    }

    pub fn record(&self) -> Option<SubunitRecord> {
        rw_read(&self.state, SOURCE, "record").record.clone()
    }

    pub fn error(&self) -> Option<FetchFailure> {
        rw_read(&self.state, SOURCE, "error").error.clone()
    }

    pub fn reset(&self) {
        *rw_write(&self.state, SOURCE, "reset") = SubunitSlotState::default();
    }
}

/// Serializable per-kind state, as rendered by [`ContentChannel::snapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct KindSnapshot {
    pub kind: ContentKind,
    pub show_drafts: bool,
    pub draft_count: usize,
    pub total: usize,
    pub items: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FetchFailure>,
}

/// Kind-erased access to one content kind's controller.
pub trait ContentChannel: Send + Sync {
    fn kind(&self) -> ContentKind;
    fn show_drafts(&self) -> bool;
    fn toggle(&self) -> bool;
    fn set_show_drafts(&self, value: bool);
    fn draft_count(&self) -> usize;
    fn error(&self) -> Option<FetchFailure>;
    fn reset(&self);
    fn snapshot(&self) -> KindSnapshot;
}

impl<T: ContentItem> ContentChannel for DraftVisibilityController<T> {
    fn kind(&self) -> ContentKind {
        T::KIND
    }

    fn show_drafts(&self) -> bool {
        DraftVisibilityController::show_drafts(self)
    }

    fn toggle(&self) -> bool {
        DraftVisibilityController::toggle(self)
    }

    fn set_show_drafts(&self, value: bool) {
        DraftVisibilityController::set_show_drafts(self, value);
    }

    fn draft_count(&self) -> usize {
        DraftVisibilityController::draft_count(self)
    }

    fn error(&self) -> Option<FetchFailure> {
        self.repository().error()
    }

    fn reset(&self) {
        DraftVisibilityController::reset(self);
    }

    fn snapshot(&self) -> KindSnapshot {
        let show_drafts = DraftVisibilityController::show_drafts(self);
        let collection = self.repository().collection();
        let view = collection.view(show_drafts);
        KindSnapshot {
            kind: T::KIND,
            show_drafts,
            draft_count: collection.draft_count(),
            total: collection.len(),
            items: view_value(T::KIND, &view),
            error: self.repository().error(),
        }
    }
}

fn view_value<T: Serialize>(kind: ContentKind, view: &[T]) -> serde_json::Value {
    serde_json::to_value(view).unwrap_or_else(|err| {
        warn!(%kind, error = %err, "content view could not be serialized");
        serde_json::Value::Null
    })
}

/// The six content controllers of one subunit.
pub struct ContentSet {
    pub news: DraftVisibilityController<NewsRecord>,
    pub events: DraftVisibilityController<EventRecord>,
    pub documents: DraftVisibilityController<DocumentRecord>,
    pub videos: DraftVisibilityController<VideoRecord>,
    pub images: DraftVisibilityController<ImageRecord>,
    pub messages: DraftVisibilityController<MessageRecord>,
}

impl ContentSet {
    pub fn new(backends: &Backends, fetcher: RetryingFetcher) -> Self {
        Self {
            news: controller(Arc::clone(&backends.news), fetcher),
            events: controller(Arc::clone(&backends.events), fetcher),
            documents: controller(Arc::clone(&backends.documents), fetcher),
            videos: controller(Arc::clone(&backends.videos), fetcher),
            images: controller(Arc::clone(&backends.images), fetcher),
            messages: controller(Arc::clone(&backends.messages), fetcher),
        }
    }

    pub fn get<T: ContentSlot>(&self) -> &DraftVisibilityController<T> {
        T::controller(self)
    }

    pub fn channel(&self, kind: ContentKind) -> &dyn ContentChannel {
        match kind {
            ContentKind::News => &self.news,
            ContentKind::Events => &self.events,
            ContentKind::Documents => &self.documents,
            ContentKind::Videos => &self.videos,
            ContentKind::Images => &self.images,
            ContentKind::Messages => &self.messages,
        }
    }

    pub fn channels(&self) -> impl Iterator<Item = &dyn ContentChannel> + '_ {
        ContentKind::ALL.into_iter().map(|kind| self.channel(kind))
    }

    pub fn reset(&self) {
        self.channels().for_each(|channel| channel.reset());
    }
}

fn controller<T: ContentItem>(
    source: Arc<dyn ContentSource<T>>,
    fetcher: RetryingFetcher,
) -> DraftVisibilityController<T> {
    DraftVisibilityController::new(ContentRepository::new(source, fetcher))
}

/// Maps a content record type to its controller inside a [`ContentSet`].
pub trait ContentSlot: ContentItem {
    fn controller(content: &ContentSet) -> &DraftVisibilityController<Self>;
}

macro_rules! content_slot {
    ($record:ty, $field:ident) => {
        impl ContentSlot for $record {
            fn controller(content: &ContentSet) -> &DraftVisibilityController<Self> {
                &content.$field
            }
        }
    };
}

content_slot!(NewsRecord, news);
content_slot!(EventRecord, events);
content_slot!(DocumentRecord, documents);
content_slot!(VideoRecord, videos);
content_slot!(ImageRecord, images);
content_slot!(MessageRecord, messages);

pub struct ReferenceLoaders {
    pub users: ReferenceLoader<UserRecord>,
    pub groups: ReferenceLoader<GroupRecord>,
    pub work_locations: ReferenceLoader<WorkLocationRecord>,
    pub positions: ReferenceLoader<PositionRecord>,
}

impl ReferenceLoaders {
    pub fn new(backends: &Backends, fetcher: RetryingFetcher) -> Self {
        Self {
            users: ReferenceLoader::new(Arc::clone(&backends.users), fetcher),
            groups: ReferenceLoader::new(Arc::clone(&backends.groups), fetcher),
            work_locations: ReferenceLoader::new(Arc::clone(&backends.work_locations), fetcher),
            positions: ReferenceLoader::new(Arc::clone(&backends.positions), fetcher),
        }
    }

    pub fn counts(&self) -> BTreeMap<ReferenceKind, usize> {
        BTreeMap::from([
            (ReferenceKind::Users, self.users.items().len()),
            (ReferenceKind::Groups, self.groups.items().len()),
            (ReferenceKind::WorkLocations, self.work_locations.items().len()),
            (ReferenceKind::Positions, self.positions.items().len()),
        ])
    }
}

/// All mutable state behind an aggregation context.
pub struct SubunitState {
    pub subunit: SubunitSlot,
    pub content: ContentSet,
    pub reference: ReferenceLoaders,
    pub cache: Arc<ReferenceCache>,
    pub cache_scope: CacheScope,
}

impl SubunitState {
    pub fn new(
        backends: &Backends,
        fetcher: RetryingFetcher,
        cache: Arc<ReferenceCache>,
        cache_scope: CacheScope,
    ) -> Self {
        Self {
            subunit: SubunitSlot::new(Arc::clone(&backends.subunits), fetcher),
            content: ContentSet::new(backends, fetcher),
            reference: ReferenceLoaders::new(backends, fetcher),
            cache,
            cache_scope,
        }
    }

    /// Drop everything tied to the previous subunit. Reference snapshots stay;
    /// the shared cache is cleared only for session-scoped caching.
    pub fn reset_for_new_identity(&self) {
        self.subunit.reset();
        self.content.reset();
        if self.cache_scope == CacheScope::Session {
            self.cache.clear();
        }
    }

    /// Recorded failures of the subunit metadata and the six content kinds.
    pub fn primary_errors(&self) -> Vec<FetchFailure> {
        self.subunit
            .error()
            .into_iter()
            .chain(self.content.channels().filter_map(|channel| channel.error()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use serde::Serializer;

    use super::*;

    struct Unrepresentable;

    impl Serialize for Unrepresentable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("no wire form"))
        }
    }

    #[test]
    fn unserializable_view_renders_as_null() {
        assert_eq!(
            view_value(ContentKind::News, &[Unrepresentable]),
            serde_json::Value::Null
        );
    }

    #[test]
    fn view_renders_as_json_array() {
        let value = view_value(ContentKind::News, &["a", "b"]);
        assert_eq!(value, serde_json::json!(["a", "b"]));
    }
}
