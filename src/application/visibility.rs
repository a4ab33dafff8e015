use std::sync::atomic::{AtomicBool, Ordering};

use crate::application::repository::ContentRepository;
use crate::domain::content::ContentItem;

/// Per-kind "show drafts" flag over an owned repository.
///
/// Flipping the flag only re-derives the view from the collection already in
/// memory; it never reaches the backend.
pub struct DraftVisibilityController<T: ContentItem> {
    repository: ContentRepository<T>,
    show_drafts: AtomicBool,
}

impl<T: ContentItem> DraftVisibilityController<T> {
    pub fn new(repository: ContentRepository<T>) -> Self {
        Self {
            repository,
            show_drafts: AtomicBool::new(false),
        }
    }

    pub fn repository(&self) -> &ContentRepository<T> {
        &self.repository
    }

    pub fn show_drafts(&self) -> bool {
        self.show_drafts.load(Ordering::SeqCst)
    }

    /// Flip the flag and return its new value.
    pub fn toggle(&self) -> bool {
        !self.show_drafts.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn set_show_drafts(&self, value: bool) {
        self.show_drafts.store(value, Ordering::SeqCst);
    }

    pub fn view(&self) -> Vec<T> {
        self.repository.collection().view(self.show_drafts())
    }

    pub fn draft_count(&self) -> usize {
        self.repository.draft_count()
    }

    /// Empty the repository and hide drafts again.
    pub fn reset(&self) {
        self.repository.reset();
        self.set_show_drafts(false);
    }
}
