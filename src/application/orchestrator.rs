//! Parallel load of one subunit, scoped to a cancellable fetch session.
//!
//! Every write into [`SubunitState`] that originates from a fetch happens
//! while holding the orchestrator lock, after re-checking that the session is
//! still the current one. Lock order is always orchestrator, then repository.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use metrics::{counter, histogram};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::application::error::FetchFailure;
use crate::application::session::FetchSession;
use crate::application::state::{ContentSlot, SubunitState};
use crate::cache::lock::mutex_lock;
use crate::domain::content::ContentCollection;

const SOURCE: &str = "application::orchestrator::FetchOrchestrator";
const METRIC_LOAD_MS: &str = "portal_load_ms";
const METRIC_SESSION_SUPERSEDED: &str = "portal_session_superseded_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPhase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Errored,
}

/// Summary of one completed, non-superseded load.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub session_id: Uuid,
    pub subunit_id: String,
    pub failures: Vec<FetchFailure>,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl LoadReport {
    pub fn primary_failures(&self) -> impl Iterator<Item = &FetchFailure> {
        self.failures.iter().filter(|f| f.scope.is_primary())
    }

    pub fn is_clean(&self) -> bool {
        self.primary_failures().next().is_none()
    }
}

fn serialize_millis<S: serde::Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(value.as_millis() as u64)
}

#[derive(Debug, Clone)]
pub enum LoadOutcome {
    Completed(LoadReport),
    /// A load for the same subunit was already in flight; nothing was started.
    AlreadyLoading,
    /// A newer load or a dispose ended this session; its results were dropped.
    Superseded,
}

/// Result of re-reading a single content kind.
#[derive(Debug, Clone)]
pub enum RefreshOutcome<T> {
    Applied(ContentCollection<T>),
    Failed(FetchFailure),
    Superseded,
}

#[derive(Default)]
struct OrchestratorState {
    active: Option<FetchSession>,
    in_flight: bool,
    loaded_subunit: Option<Arc<str>>,
    phase: LoadPhase,
    last_report: Option<LoadReport>,
}

impl OrchestratorState {
    fn is_current(&self, session: &FetchSession) -> bool {
        !session.is_cancelled()
            && self
                .active
                .as_ref()
                .is_some_and(|active| active.id() == session.id())
    }
}

#[derive(Default)]
pub struct FetchOrchestrator {
    inner: Mutex<OrchestratorState>,
}

impl FetchOrchestrator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> LoadPhase {
        mutex_lock(&self.inner, SOURCE, "phase").phase
    }

    pub fn is_loading(&self) -> bool {
        mutex_lock(&self.inner, SOURCE, "is_loading").in_flight
    }

    pub fn last_report(&self) -> Option<LoadReport> {
        mutex_lock(&self.inner, SOURCE, "last_report")
            .last_report
            .clone()
    }

    /// Session of the most recent load, whether or not it is still running.
    pub fn current(&self) -> Option<FetchSession> {
        mutex_lock(&self.inner, SOURCE, "current").active.clone()
    }

    /// Start a new session for `subunit_id`, cancelling the previous one.
    ///
    /// Returns `None` when a load for the same subunit is already in flight.
    pub fn begin(&self, subunit_id: &str, state: &SubunitState) -> Option<FetchSession> {
        let mut inner = mutex_lock(&self.inner, SOURCE, "begin");
        if inner.in_flight
            && inner
                .active
                .as_ref()
                .is_some_and(|active| active.subunit_id() == subunit_id)
        {
            debug!(subunit_id, "load already in flight, ignoring re-entry");
            return None;
        }

        if let Some(previous) = inner.active.take() {
            previous.cancel();
            if inner.in_flight {
                counter!(METRIC_SESSION_SUPERSEDED).increment(1);
                debug!(
                    session = %previous.id(),
                    subunit_id = previous.subunit_id(),
                    "superseded in-flight session"
                );
            }
        }

        if inner.loaded_subunit.as_deref() != Some(subunit_id) {
            state.reset_for_new_identity();
            inner.loaded_subunit = Some(Arc::from(subunit_id));
        }

        let session = FetchSession::new(subunit_id);
        debug!(session = %session.id(), subunit_id, "session started");
        inner.active = Some(session.clone());
        inner.in_flight = true;
        inner.phase = LoadPhase::Loading;
        Some(session)
    }

    /// Load subunit metadata, all six content kinds and the reference data
    /// concurrently, then publish the results in one commit.
    #[instrument(skip(self, state))]
    pub async fn load(&self, subunit_id: &str, state: &SubunitState) -> LoadOutcome {
        let Some(session) = self.begin(subunit_id, state) else {
            return LoadOutcome::AlreadyLoading;
        };
        let started_at = Instant::now();
        let id = session.subunit_id();
        let cache = state.cache.as_ref();
        let content = &state.content;
        let reference = &state.reference;

        let (
            subunit,
            news,
            events,
            documents,
            videos,
            images,
            messages,
            users,
            groups,
            work_locations,
            positions,
        ) = tokio::join!(
            session.guard(state.subunit.fetch(id)),
            content.news.repository().fetch(&session),
            content.events.repository().fetch(&session),
            content.documents.repository().fetch(&session),
            content.videos.repository().fetch(&session),
            content.images.repository().fetch(&session),
            content.messages.repository().fetch(&session),
            session.guard(reference.users.fetch(cache)),
            session.guard(reference.groups.fetch(cache)),
            session.guard(reference.work_locations.fetch(cache)),
            session.guard(reference.positions.fetch(cache)),
        );

        let mut inner = mutex_lock(&self.inner, SOURCE, "finish");
        if !inner.is_current(&session) {
            debug!(session = %session.id(), subunit_id, "load superseded, results discarded");
            return LoadOutcome::Superseded;
        }

        let mut failures = Vec::new();
        failures.extend(state.subunit.apply(subunit));
        failures.extend(content.news.repository().apply(news).err());
        failures.extend(content.events.repository().apply(events).err());
        failures.extend(content.documents.repository().apply(documents).err());
        failures.extend(content.videos.repository().apply(videos).err());
        failures.extend(content.images.repository().apply(images).err());
        failures.extend(content.messages.repository().apply(messages).err());
        failures.extend(reference.users.apply(cache, users));
        failures.extend(reference.groups.apply(cache, groups));
        failures.extend(reference.work_locations.apply(cache, work_locations));
        failures.extend(reference.positions.apply(cache, positions));

        let report = LoadReport {
            session_id: session.id(),
            subunit_id: subunit_id.to_string(),
            failures,
            elapsed: started_at.elapsed(),
        };
        inner.in_flight = false;
        inner.phase = if report.is_clean() {
            LoadPhase::Ready
        } else {
            LoadPhase::Errored
        };
        inner.last_report = Some(report.clone());
        drop(inner);

        histogram!(METRIC_LOAD_MS).record(report.elapsed.as_secs_f64() * 1000.0);
        let failed: Vec<String> = report.failures.iter().map(|f| f.scope.to_string()).collect();
        info!(
            subunit_id,
            session = %report.session_id,
            elapsed_ms = report.elapsed.as_millis() as u64,
            failed = ?failed,
            "subunit load complete"
        );
        LoadOutcome::Completed(report)
    }

    /// Re-read one content kind under `session`, outside a full load.
    pub async fn refresh<T: ContentSlot>(
        &self,
        session: &FetchSession,
        state: &SubunitState,
    ) -> RefreshOutcome<T> {
        let repository = state.content.get::<T>().repository();
        let fetched = repository.fetch(session).await;

        let mut inner = mutex_lock(&self.inner, SOURCE, "refresh");
        if !inner.is_current(session) {
            debug!(session = %session.id(), kind = %T::KIND, "refresh superseded, result discarded");
            return RefreshOutcome::Superseded;
        }
        let outcome = match repository.apply(fetched) {
            Ok(collection) => RefreshOutcome::Applied(collection),
            Err(failure) => RefreshOutcome::Failed(failure),
        };
        if !inner.in_flight {
            inner.phase = if state.primary_errors().is_empty() {
                LoadPhase::Ready
            } else {
                LoadPhase::Errored
            };
        }
        outcome
    }

    /// Cancel the current session and forget the loaded identity together
    /// with everything loaded for it.
    pub fn dispose(&self, state: &SubunitState) {
        let mut inner = mutex_lock(&self.inner, SOURCE, "dispose");
        if let Some(session) = inner.active.take() {
            session.cancel();
            if inner.in_flight {
                counter!(METRIC_SESSION_SUPERSEDED).increment(1);
            }
            debug!(session = %session.id(), "session disposed");
        }
        state.reset_for_new_identity();
        *inner = OrchestratorState::default();
    }
}
