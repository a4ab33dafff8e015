use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::application::backend::BackendError;
use crate::domain::error::DomainError;
use crate::domain::types::{ContentKind, ReferenceKind};
use crate::infra::error::InfraError;

/// Which collection a failed load belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "scope", content = "kind", rename_all = "snake_case")]
pub enum FailureScope {
    Subunit,
    Content(ContentKind),
    Reference(ReferenceKind),
}

impl FailureScope {
    /// Reference-data failures degrade silently; everything else is surfaced.
    pub fn is_primary(self) -> bool {
        !matches!(self, FailureScope::Reference(_))
    }
}

impl fmt::Display for FailureScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureScope::Subunit => f.write_str("subunit"),
            FailureScope::Content(kind) => write!(f, "content:{kind}"),
            FailureScope::Reference(kind) => write!(f, "reference:{kind}"),
        }
    }
}

/// A recorded load failure, kept alongside the data it failed to refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub scope: FailureScope,
    pub message: String,
    pub retryable: bool,
}

impl FetchFailure {
    pub fn new(scope: FailureScope, error: &BackendError) -> Self {
        Self {
            scope,
            message: error.to_string(),
            retryable: error.is_retryable(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.scope, self.message)
    }
}

/// Errors returned to callers of the aggregation façade.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("no subunit has been loaded")]
    NotLoaded,
    #[error("refresh failed: {0}")]
    Refresh(FetchFailure),
    #[error("the subunit changed before the refresh could be applied")]
    Superseded,
}

impl ContextError {
    /// True when the failure was detected locally, before any remote call.
    pub fn is_validation(&self) -> bool {
        matches!(self, ContextError::Domain(DomainError::Validation { .. }))
    }
}

/// Top-level error for the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Context(#[from] ContextError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
