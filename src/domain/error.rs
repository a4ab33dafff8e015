use thiserror::Error;

use crate::domain::types::ContentKind;

#[derive(Debug, Clone, Error)]
pub enum DomainError {
    #[error("{kind} item `{id}` not found in the loaded collection")]
    NotFound { kind: ContentKind, id: String },
    #[error("validation failed: {message}")]
    Validation { message: String },
    #[error("domain invariant violated: {message}")]
    Invariant { message: String },
}

impl DomainError {
    pub fn not_found(kind: ContentKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }
}
