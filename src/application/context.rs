//! The aggregation façade handed to UI consumers.
//!
//! A context is an explicit, caller-owned value: construct one per active
//! subunit view, call [`AggregationContext::load`] when the identity is known
//! and [`AggregationContext::dispose`] when the view goes away.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::application::backend::Backends;
use crate::application::error::{ContextError, FetchFailure};
use crate::application::mutation::MutationGateway;
use crate::application::orchestrator::{
    FetchOrchestrator, LoadOutcome, LoadPhase, LoadReport, RefreshOutcome,
};
use crate::application::reference::ReferenceCache;
use crate::application::retry::{RetryPolicy, RetryingFetcher};
use crate::application::state::{ContentSlot, KindSnapshot, SubunitState};
use crate::cache::CacheScope;
use crate::domain::content::ContentCollection;
use crate::domain::entities::{
    GroupRecord, PositionRecord, SubunitRecord, UserRecord, WorkLocationRecord,
};
use crate::domain::types::{ContentKind, ReferenceKind};

/// Serializable read-out of everything a context currently exposes.
#[derive(Debug, Clone, Serialize)]
pub struct PortalSnapshot {
    pub phase: LoadPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subunit: Option<SubunitRecord>,
    pub content: Vec<KindSnapshot>,
    pub reference: BTreeMap<ReferenceKind, usize>,
    pub errors: Vec<FetchFailure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_load: Option<LoadReport>,
}

pub struct AggregationContext {
    state: SubunitState,
    orchestrator: FetchOrchestrator,
}

impl AggregationContext {
    pub fn new(
        backends: Backends,
        policy: RetryPolicy,
        cache: Arc<ReferenceCache>,
        cache_scope: CacheScope,
    ) -> Self {
        let fetcher = RetryingFetcher::new(policy);
        Self {
            state: SubunitState::new(&backends, fetcher, cache, cache_scope),
            orchestrator: FetchOrchestrator::new(),
        }
    }

    /// Load `subunit_id`, superseding any load for a different identity.
    pub async fn load(&self, subunit_id: &str) -> LoadOutcome {
        self.orchestrator.load(subunit_id, &self.state).await
    }

    /// Cancel in-flight work and drop all per-subunit state. Results of the
    /// cancelled session never become visible.
    pub fn dispose(&self) {
        self.orchestrator.dispose(&self.state);
    }

    pub fn phase(&self) -> LoadPhase {
        self.orchestrator.phase()
    }

    pub fn is_loading(&self) -> bool {
        self.orchestrator.is_loading()
    }

    pub fn last_report(&self) -> Option<LoadReport> {
        self.orchestrator.last_report()
    }

    pub fn subunit(&self) -> Option<SubunitRecord> {
        self.state.subunit.record()
    }

    /// First surfaced failure, if any. Reference-data failures never appear here.
    pub fn error(&self) -> Option<FetchFailure> {
        self.errors().into_iter().next()
    }

    pub fn errors(&self) -> Vec<FetchFailure> {
        self.state.primary_errors()
    }

    pub fn error_for(&self, kind: ContentKind) -> Option<FetchFailure> {
        self.state.content.channel(kind).error()
    }

    pub fn view<T: ContentSlot>(&self) -> Vec<T> {
        self.state.content.get::<T>().view()
    }

    pub fn collection<T: ContentSlot>(&self) -> ContentCollection<T> {
        self.state.content.get::<T>().repository().collection()
    }

    pub fn featured<T: ContentSlot>(&self) -> Vec<T> {
        self.state.content.get::<T>().repository().featured()
    }

    pub fn draft_count<T: ContentSlot>(&self) -> usize {
        self.state.content.get::<T>().draft_count()
    }

    pub fn show_drafts<T: ContentSlot>(&self) -> bool {
        self.state.content.get::<T>().show_drafts()
    }

    pub fn toggle_drafts<T: ContentSlot>(&self) -> bool {
        self.state.content.get::<T>().toggle()
    }

    pub fn set_show_drafts<T: ContentSlot>(&self, value: bool) {
        self.state.content.get::<T>().set_show_drafts(value);
    }

    pub fn draft_count_of(&self, kind: ContentKind) -> usize {
        self.state.content.channel(kind).draft_count()
    }

    pub fn toggle_drafts_of(&self, kind: ContentKind) -> bool {
        self.state.content.channel(kind).toggle()
    }

    pub fn set_show_drafts_of(&self, kind: ContentKind, value: bool) {
        self.state.content.channel(kind).set_show_drafts(value);
    }

    pub fn users(&self) -> Arc<Vec<UserRecord>> {
        self.state.reference.users.items()
    }

    pub fn groups(&self) -> Arc<Vec<GroupRecord>> {
        self.state.reference.groups.items()
    }

    pub fn work_locations(&self) -> Arc<Vec<WorkLocationRecord>> {
        self.state.reference.work_locations.items()
    }

    pub fn positions(&self) -> Arc<Vec<PositionRecord>> {
        self.state.reference.positions.items()
    }

    /// Drop cached reference data; the next load fetches it again.
    pub fn invalidate_reference(&self) {
        self.state.cache.clear();
    }

    pub fn mutations(&self) -> MutationGateway<'_> {
        MutationGateway::new(&self.state, &self.orchestrator)
    }

    /// Re-read one kind for the loaded subunit without a full reload.
    pub async fn refresh<T: ContentSlot>(&self) -> Result<ContentCollection<T>, ContextError> {
        let session = self.orchestrator.current().ok_or(ContextError::NotLoaded)?;
        match self.orchestrator.refresh::<T>(&session, &self.state).await {
            RefreshOutcome::Applied(collection) => Ok(collection),
            RefreshOutcome::Failed(failure) => Err(ContextError::Refresh(failure)),
            RefreshOutcome::Superseded => Err(ContextError::Superseded),
        }
    }

    pub fn snapshot(&self) -> PortalSnapshot {
        PortalSnapshot {
            phase: self.phase(),
            subunit: self.subunit(),
            content: self
                .state
                .content
                .channels()
                .map(|channel| channel.snapshot())
                .collect(),
            reference: self.state.reference.counts(),
            errors: self.errors(),
            last_load: self.last_report(),
        }
    }
}
