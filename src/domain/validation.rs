//! Client-side required-field checks run before any mutation leaves the process.

use portal_api_types::{
    CreateDocumentRequest, CreateEventRequest, CreateImageRequest, CreateMessageRequest,
    CreateNewsRequest, CreateVideoRequest, DocumentPatch, EventPatch, ImagePatch, MessagePatch,
    NewsPatch, VideoPatch,
};
use time::OffsetDateTime;

use crate::domain::entities::EventRecord;
use crate::domain::error::DomainError;
use crate::domain::types::ContentKind;

pub trait Validate {
    fn validate(&self) -> Result<(), DomainError>;
}

fn ensure_non_empty(kind: ContentKind, field: &'static str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!(
            "{kind}: `{field}` is required"
        )));
    }
    Ok(())
}

/// Sparse patches may omit a required field but never blank it.
fn ensure_not_blanked(
    kind: ContentKind,
    field: &'static str,
    value: Option<&String>,
) -> Result<(), DomainError> {
    match value {
        Some(value) => ensure_non_empty(kind, field, value),
        None => Ok(()),
    }
}

fn ensure_event_window(
    starts_at: OffsetDateTime,
    ends_at: Option<OffsetDateTime>,
) -> Result<(), DomainError> {
    if ends_at.is_some_and(|ends_at| ends_at < starts_at) {
        return Err(DomainError::validation(
            "events: `ends_at` must not precede `starts_at`",
        ));
    }
    Ok(())
}

/// Window of `current` after `patch` is applied.
pub fn validate_event_patch(current: &EventRecord, patch: &EventPatch) -> Result<(), DomainError> {
    patch.validate()?;
    ensure_event_window(
        patch.starts_at.unwrap_or(current.starts_at),
        patch.ends_at.or(current.ends_at),
    )
}

impl Validate for CreateNewsRequest {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(ContentKind::News, "subunit_id", &self.subunit_id)?;
        ensure_non_empty(ContentKind::News, "title", &self.title)?;
        ensure_non_empty(ContentKind::News, "body", &self.body)
    }
}

impl Validate for CreateEventRequest {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(ContentKind::Events, "subunit_id", &self.subunit_id)?;
        ensure_non_empty(ContentKind::Events, "title", &self.title)?;
        ensure_non_empty(ContentKind::Events, "location", &self.location)?;
        let Some(starts_at) = self.starts_at else {
            return Err(DomainError::validation("events: `starts_at` is required"));
        };
        ensure_event_window(starts_at, self.ends_at)
    }
}

impl Validate for CreateDocumentRequest {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(ContentKind::Documents, "subunit_id", &self.subunit_id)?;
        ensure_non_empty(ContentKind::Documents, "title", &self.title)?;
        ensure_non_empty(ContentKind::Documents, "file_url", &self.file_url)
    }
}

impl Validate for CreateVideoRequest {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(ContentKind::Videos, "subunit_id", &self.subunit_id)?;
        ensure_non_empty(ContentKind::Videos, "title", &self.title)?;
        ensure_non_empty(ContentKind::Videos, "video_url", &self.video_url)
    }
}

impl Validate for CreateImageRequest {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(ContentKind::Images, "subunit_id", &self.subunit_id)?;
        ensure_non_empty(ContentKind::Images, "title", &self.title)?;
        ensure_non_empty(ContentKind::Images, "image_url", &self.image_url)
    }
}

impl Validate for CreateMessageRequest {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_non_empty(ContentKind::Messages, "subunit_id", &self.subunit_id)?;
        ensure_non_empty(ContentKind::Messages, "title", &self.title)?;
        ensure_non_empty(ContentKind::Messages, "content", &self.content)
    }
}

impl Validate for NewsPatch {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_not_blanked(ContentKind::News, "title", self.title.as_ref())?;
        ensure_not_blanked(ContentKind::News, "body", self.body.as_ref())
    }
}

impl Validate for EventPatch {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_not_blanked(ContentKind::Events, "title", self.title.as_ref())?;
        ensure_not_blanked(ContentKind::Events, "location", self.location.as_ref())?;
        if let Some(starts_at) = self.starts_at {
            ensure_event_window(starts_at, self.ends_at)?;
        }
        Ok(())
    }
}

impl Validate for DocumentPatch {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_not_blanked(ContentKind::Documents, "title", self.title.as_ref())?;
        ensure_not_blanked(ContentKind::Documents, "file_url", self.file_url.as_ref())
    }
}

impl Validate for VideoPatch {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_not_blanked(ContentKind::Videos, "title", self.title.as_ref())?;
        ensure_not_blanked(ContentKind::Videos, "video_url", self.video_url.as_ref())
    }
}

impl Validate for ImagePatch {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_not_blanked(ContentKind::Images, "title", self.title.as_ref())?;
        ensure_not_blanked(ContentKind::Images, "image_url", self.image_url.as_ref())
    }
}

impl Validate for MessagePatch {
    fn validate(&self) -> Result<(), DomainError> {
        ensure_not_blanked(ContentKind::Messages, "title", self.title.as_ref())?;
        ensure_not_blanked(ContentKind::Messages, "content", self.content.as_ref())
    }
}
