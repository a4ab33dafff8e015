//! Traits describing the remote content service, consumed as black boxes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::application::reference::ReferenceItem;
use crate::domain::content::ContentItem;
use crate::domain::entities::{
    DocumentRecord, EventRecord, GroupRecord, ImageRecord, MessageRecord, NewsRecord,
    PositionRecord, SubunitRecord, UserRecord, VideoRecord, WorkLocationRecord,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("request was not authorized")]
    Unauthorized,
    #[error("request was forbidden")]
    Forbidden,
    #[error("resource not found")]
    NotFound,
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("server error with status {status}: {message}")]
    Server { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("request cancelled")]
    Cancelled,
}

impl BackendError {
    /// Transient failures worth another attempt: timeouts, network failures,
    /// and server-side errors. Authorization, validation and lookup failures
    /// are permanent.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Server { .. } | BackendError::Network(_) | BackendError::Timeout(_)
        )
    }

    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => BackendError::Unauthorized,
            403 => BackendError::Forbidden,
            404 => BackendError::NotFound,
            408 | 429 | 500..=599 => BackendError::Server { status, message },
            _ => BackendError::Rejected { status, message },
        }
    }

    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

#[async_trait]
pub trait SubunitSource: Send + Sync {
    async fn fetch(&self, subunit_id: &str) -> Result<SubunitRecord, BackendError>;
}

/// Per-kind collection endpoint. `list` always returns the full set for the
/// subunit, drafts included.
#[async_trait]
pub trait ContentSource<T: ContentItem>: Send + Sync {
    async fn list(&self, subunit_id: &str) -> Result<Vec<T>, BackendError>;

    async fn create(&self, payload: &T::Create) -> Result<T, BackendError>;

    async fn update(&self, id: &str, patch: &T::Patch) -> Result<T, BackendError>;

    async fn delete(&self, id: &str) -> Result<(), BackendError>;
}

#[async_trait]
pub trait ReferenceSource<R: ReferenceItem>: Send + Sync {
    async fn list(&self) -> Result<Vec<R>, BackendError>;
}

/// Every remote endpoint the aggregation layer talks to.
#[derive(Clone)]
pub struct Backends {
    pub subunits: Arc<dyn SubunitSource>,
    pub news: Arc<dyn ContentSource<NewsRecord>>,
    pub events: Arc<dyn ContentSource<EventRecord>>,
    pub documents: Arc<dyn ContentSource<DocumentRecord>>,
    pub videos: Arc<dyn ContentSource<VideoRecord>>,
    pub images: Arc<dyn ContentSource<ImageRecord>>,
    pub messages: Arc<dyn ContentSource<MessageRecord>>,
    pub users: Arc<dyn ReferenceSource<UserRecord>>,
    pub groups: Arc<dyn ReferenceSource<GroupRecord>>,
    pub work_locations: Arc<dyn ReferenceSource<WorkLocationRecord>>,
    pub positions: Arc<dyn ReferenceSource<PositionRecord>>,
}

impl Backends {
    /// Route every endpoint to one backend implementation.
    pub fn from_shared<B>(backend: Arc<B>) -> Self
    where
        B: SubunitSource
            + ContentSource<NewsRecord>
            + ContentSource<EventRecord>
            + ContentSource<DocumentRecord>
            + ContentSource<VideoRecord>
            + ContentSource<ImageRecord>
            + ContentSource<MessageRecord>
            + ReferenceSource<UserRecord>
            + ReferenceSource<GroupRecord>
            + ReferenceSource<WorkLocationRecord>
            + ReferenceSource<PositionRecord>
            + 'static,
    {
        Self {
            subunits: backend.clone(),
            news: backend.clone(),
            events: backend.clone(),
            documents: backend.clone(),
            videos: backend.clone(),
            images: backend.clone(),
            messages: backend.clone(),
            users: backend.clone(),
            groups: backend.clone(),
            work_locations: backend.clone(),
            positions: backend,
        }
    }
}
