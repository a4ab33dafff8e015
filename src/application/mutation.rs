//! Write path: one remote call per mutation, followed by a refresh of the
//! owning kind only. Mutations are never retried.

use portal_api_types::{FlagPatch, SubunitScoped};
use tracing::{debug, info, warn};

use crate::application::error::ContextError;
use crate::application::orchestrator::{FetchOrchestrator, RefreshOutcome};
use crate::application::session::FetchSession;
use crate::application::state::{ContentSlot, SubunitState};
use crate::domain::error::DomainError;
use crate::domain::validation::Validate;

pub struct MutationGateway<'a> {
    state: &'a SubunitState,
    orchestrator: &'a FetchOrchestrator,
}

impl<'a> MutationGateway<'a> {
    pub fn new(state: &'a SubunitState, orchestrator: &'a FetchOrchestrator) -> Self {
        Self {
            state,
            orchestrator,
        }
    }

    pub async fn create<T: ContentSlot>(&self, payload: T::Create) -> Result<T, ContextError> {
        payload.validate()?;
        let session = self.session()?;
        if payload.subunit_id() != session.subunit_id() {
            return Err(DomainError::invariant(format!(
                "{}: payload targets subunit `{}` but `{}` is loaded",
                T::KIND,
                payload.subunit_id(),
                session.subunit_id()
            ))
            .into());
        }

        let source = self.state.content.get::<T>().repository().source();
        let created = source.create(&payload).await.inspect_err(|err| {
            warn!(kind = %T::KIND, error = %err, "create rejected");
        })?;
        info!(kind = %T::KIND, id = created.id(), "content created");

        self.refresh_owner::<T>(&session).await;
        Ok(created)
    }

    pub async fn update<T: ContentSlot>(&self, id: &str, patch: T::Patch) -> Result<T, ContextError> {
        let session = self.session()?;
        let current = self.loaded::<T>(id)?;
        current.validate_patch(&patch)?;

        let source = self.state.content.get::<T>().repository().source();
        let updated = source.update(id, &patch).await.inspect_err(|err| {
            warn!(kind = %T::KIND, id, error = %err, "update rejected");
        })?;
        info!(kind = %T::KIND, id, "content updated");

        self.refresh_owner::<T>(&session).await;
        Ok(updated)
    }

    pub async fn delete<T: ContentSlot>(&self, id: &str) -> Result<(), ContextError> {
        let session = self.session()?;
        self.loaded::<T>(id)?;

        let source = self.state.content.get::<T>().repository().source();
        source.delete(id).await.inspect_err(|err| {
            warn!(kind = %T::KIND, id, error = %err, "delete rejected");
        })?;
        info!(kind = %T::KIND, id, "content deleted");

        self.refresh_owner::<T>(&session).await;
        Ok(())
    }

    pub async fn set_published<T: ContentSlot>(
        &self,
        id: &str,
        published: bool,
    ) -> Result<T, ContextError> {
        self.update::<T>(id, T::Patch::default().with_published(published))
            .await
    }

    pub async fn set_featured<T: ContentSlot>(
        &self,
        id: &str,
        featured: bool,
    ) -> Result<T, ContextError> {
        self.update::<T>(id, T::Patch::default().with_featured(featured))
            .await
    }

    fn session(&self) -> Result<FetchSession, ContextError> {
        self.orchestrator.current().ok_or(ContextError::NotLoaded)
    }

    fn loaded<T: ContentSlot>(&self, id: &str) -> Result<T, DomainError> {
        if id.trim().is_empty() {
            return Err(DomainError::validation(format!("{}: `id` is required", T::KIND)));
        }
        let collection = self.state.content.get::<T>().repository().collection();
        collection
            .get(id)
            .cloned()
            .ok_or_else(|| DomainError::not_found(T::KIND, id))
    }

    /// The write already succeeded; a failed refresh is recorded on the kind
    /// and a superseded one is dropped.
    async fn refresh_owner<T: ContentSlot>(&self, session: &FetchSession) {
        match self.orchestrator.refresh::<T>(session, self.state).await {
            RefreshOutcome::Applied(collection) => {
                debug!(kind = %T::KIND, items = collection.len(), "refreshed after write");
            }
            RefreshOutcome::Failed(failure) => {
                warn!(kind = %T::KIND, error = %failure, "refresh after write failed");
            }
            RefreshOutcome::Superseded => {
                debug!(kind = %T::KIND, "refresh after write superseded");
            }
        }
    }
}
