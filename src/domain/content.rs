//! Content item abstraction shared by the six content kinds, and the
//! per-subunit collection that derives draft counts and visibility views.

use std::sync::Arc;

use portal_api_types::{
    CreateDocumentRequest, CreateEventRequest, CreateImageRequest, CreateMessageRequest,
    CreateNewsRequest, CreateVideoRequest, DocumentPatch, EventPatch, FlagPatch, ImagePatch,
    MessagePatch, NewsPatch, SubunitScoped, VideoPatch,
};
use serde::{Serialize, de::DeserializeOwned};
use time::OffsetDateTime;

use crate::domain::entities::{
    DocumentRecord, EventRecord, ImageRecord, MessageRecord, NewsRecord, VideoRecord,
};
use crate::domain::error::DomainError;
use crate::domain::types::ContentKind;
use crate::domain::validation::{Validate, validate_event_patch};

pub trait ContentItem: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    const KIND: ContentKind;

    type Create: Validate + SubunitScoped + Serialize + Send + Sync + 'static;
    type Patch: FlagPatch + Validate + Send + Sync + 'static;

    fn id(&self) -> &str;
    fn is_published(&self) -> bool;
    fn is_featured(&self) -> bool;
    fn created_at(&self) -> OffsetDateTime;

    /// Collections are ordered by this key, newest first.
    fn sort_key(&self) -> OffsetDateTime {
        self.created_at()
    }

    /// Checks `patch` as it would apply to this stored item.
    fn validate_patch(&self, patch: &Self::Patch) -> Result<(), DomainError> {
        patch.validate()
    }
}

/// Full collection of one content kind for one subunit.
///
/// `draft_count` is computed once at construction and never patched; a new
/// fetch produces a new collection.
#[derive(Debug, Clone)]
pub struct ContentCollection<T> {
    items: Arc<Vec<T>>,
    draft_count: usize,
}

impl<T: ContentItem> ContentCollection<T> {
    pub fn new(mut items: Vec<T>) -> Self {
        items.sort_by(|a, b| {
            b.sort_key()
                .cmp(&a.sort_key())
                .then_with(|| a.id().cmp(b.id()))
        });
        let draft_count = items.iter().filter(|item| !item.is_published()).count();
        Self {
            items: Arc::new(items),
            draft_count,
        }
    }

    pub fn empty() -> Self {
        Self {
            items: Arc::new(Vec::new()),
            draft_count: 0,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn draft_count(&self) -> usize {
        self.draft_count
    }

    pub fn published_count(&self) -> usize {
        self.items.len() - self.draft_count
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    /// Derived view: everything when drafts are shown, published items otherwise.
    pub fn view(&self, show_drafts: bool) -> Vec<T> {
        if show_drafts {
            return self.items.to_vec();
        }
        self.items
            .iter()
            .filter(|item| item.is_published())
            .cloned()
            .collect()
    }

    pub fn featured(&self) -> Vec<T> {
        self.items
            .iter()
            .filter(|item| item.is_published() && item.is_featured())
            .cloned()
            .collect()
    }
}

impl<T: ContentItem> Default for ContentCollection<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl ContentItem for NewsRecord {
    const KIND: ContentKind = ContentKind::News;
    type Create = CreateNewsRequest;
    type Patch = NewsPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_published(&self) -> bool {
        self.is_published
    }

    fn is_featured(&self) -> bool {
        self.is_featured
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

impl ContentItem for EventRecord {
    const KIND: ContentKind = ContentKind::Events;
    type Create = CreateEventRequest;
    type Patch = EventPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_published(&self) -> bool {
        self.is_published
    }

    fn is_featured(&self) -> bool {
        self.is_featured
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    fn validate_patch(&self, patch: &EventPatch) -> Result<(), DomainError> {
        validate_event_patch(self, patch)
    }

    fn sort_key(&self) -> OffsetDateTime {
        self.starts_at
    }
}

impl ContentItem for DocumentRecord {
    const KIND: ContentKind = ContentKind::Documents;
    type Create = CreateDocumentRequest;
    type Patch = DocumentPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_published(&self) -> bool {
        self.is_published
    }

    fn is_featured(&self) -> bool {
        self.is_featured
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

impl ContentItem for VideoRecord {
    const KIND: ContentKind = ContentKind::Videos;
    type Create = CreateVideoRequest;
    type Patch = VideoPatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_published(&self) -> bool {
        self.is_published
    }

    fn is_featured(&self) -> bool {
        self.is_featured
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

impl ContentItem for ImageRecord {
    const KIND: ContentKind = ContentKind::Images;
    type Create = CreateImageRequest;
    type Patch = ImagePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_published(&self) -> bool {
        self.is_published
    }

    fn is_featured(&self) -> bool {
        self.is_featured
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}

impl ContentItem for MessageRecord {
    const KIND: ContentKind = ContentKind::Messages;
    type Create = CreateMessageRequest;
    type Patch = MessagePatch;

    fn id(&self) -> &str {
        &self.id
    }

    fn is_published(&self) -> bool {
        self.is_published
    }

    fn is_featured(&self) -> bool {
        self.is_featured
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }
}
