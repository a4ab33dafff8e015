//! Per-kind content repository.
//!
//! A refresh always pulls the whole collection for the subunit in one call;
//! the draft count and published-only view are derived locally from it.
//! Every fetch is numbered when it starts, and a result older than the last
//! one applied is dropped, so a slow load cannot overwrite a newer refresh.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::application::backend::{BackendError, ContentSource};
use crate::application::error::{FailureScope, FetchFailure};
use crate::application::retry::RetryingFetcher;
use crate::application::session::FetchSession;
use crate::cache::lock::{rw_read, rw_write};
use crate::domain::content::{ContentCollection, ContentItem};
use crate::domain::types::ContentKind;

const SOURCE: &str = "application::repository::ContentRepository";

struct RepositoryState<T> {
    collection: ContentCollection<T>,
    error: Option<FetchFailure>,
    loaded: bool,
    /// Sequence of the newest fetch whose result was applied.
    applied: u64,
}

impl<T: ContentItem> Default for RepositoryState<T> {
    fn default() -> Self {
        Self {
            collection: ContentCollection::empty(),
            error: None,
            loaded: false,
            applied: 0,
        }
    }
}

/// Outcome of one list call, tagged with the order it was issued in.
#[derive(Debug)]
pub struct Fetched<T> {
    sequence: u64,
    result: Result<ContentCollection<T>, BackendError>,
}

impl<T> Fetched<T> {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn result(&self) -> &Result<ContentCollection<T>, BackendError> {
        &self.result
    }
}

pub struct ContentRepository<T: ContentItem> {
    source: Arc<dyn ContentSource<T>>,
    fetcher: RetryingFetcher,
    issued: AtomicU64,
    state: RwLock<RepositoryState<T>>,
}

impl<T: ContentItem> ContentRepository<T> {
    pub fn new(source: Arc<dyn ContentSource<T>>, fetcher: RetryingFetcher) -> Self {
        Self {
            source,
            fetcher,
            issued: AtomicU64::new(0),
            state: RwLock::new(RepositoryState::default()),
        }
    }

    pub fn kind(&self) -> ContentKind {
        T::KIND
    }

    pub(crate) fn source(&self) -> &dyn ContentSource<T> {
        self.source.as_ref()
    }

    /// Network half of a refresh; leaves repository state untouched.
    ///
    /// The sequence number is taken before the first request goes out.
    pub async fn fetch(&self, session: &FetchSession) -> Fetched<T> {
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let subunit_id = session.subunit_id();
        let result = session
            .guard(
                self.fetcher
                    .execute(T::KIND.as_str(), || self.source.list(subunit_id)),
            )
            .await
            .map(ContentCollection::new);
        Fetched { sequence, result }
    }

    /// Commit half of a refresh.
    ///
    /// A failure is recorded next to the previously loaded collection, which
    /// stays visible. A result issued before the last applied one changes
    /// nothing and yields the collection currently held.
    pub fn apply(&self, fetched: Fetched<T>) -> Result<ContentCollection<T>, FetchFailure> {
        let mut state = rw_write(&self.state, SOURCE, "apply");
        if fetched.sequence <= state.applied {
            debug!(
                kind = %T::KIND,
                sequence = fetched.sequence,
                applied = state.applied,
                "stale fetch result dropped"
            );
            return match &state.error {
                Some(failure) => Err(failure.clone()),
                None => Ok(state.collection.clone()),
            };
        }
        state.applied = fetched.sequence;
        match fetched.result {
            Ok(collection) => {
                state.collection = collection.clone();
                state.error = None;
                state.loaded = true;
                Ok(collection)
            }
            Err(err) => {
                let failure = FetchFailure::new(FailureScope::Content(T::KIND), &err);
                state.error = Some(failure.clone());
                Err(failure)
            }
        }
    }

    pub async fn refresh(&self, session: &FetchSession) -> Result<ContentCollection<T>, FetchFailure> {
        let fetched = self.fetch(session).await;
        self.apply(fetched)
    }

    /// Forget everything loaded for the previous subunit. The applied
    /// sequence survives so results issued before the reset stay stale.
    pub fn reset(&self) {
        let mut state = rw_write(&self.state, SOURCE, "reset");
        *state = RepositoryState {
            applied: state.applied,
            ..RepositoryState::default()
        };
    }

    pub fn collection(&self) -> ContentCollection<T> {
        rw_read(&self.state, SOURCE, "collection").collection.clone()
    }

    pub fn draft_count(&self) -> usize {
        rw_read(&self.state, SOURCE, "draft_count")
            .collection
            .draft_count()
    }

    pub fn featured(&self) -> Vec<T> {
        rw_read(&self.state, SOURCE, "featured").collection.featured()
    }

    pub fn error(&self) -> Option<FetchFailure> {
        rw_read(&self.state, SOURCE, "error").error.clone()
    }

    /// Whether at least one refresh has succeeded since the last reset.
    pub fn is_loaded(&self) -> bool {
        rw_read(&self.state, SOURCE, "is_loaded").loaded
    }
}
