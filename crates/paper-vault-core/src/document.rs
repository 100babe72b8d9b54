//! The document record and its distribution window.
//!
//! A [`Document`] binds display metadata to exactly one ciphertext artifact
//! and the key material that sealed it. The record itself never carries
//! plaintext.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WindowError;
use crate::keys::KeyMaterial;
use crate::types::{ActorId, ArtifactRef, DocumentId};

/// The `{start, end}` interval during which decryption is permitted.
///
/// Both bounds are inclusive. Construction enforces `start < end`, and the
/// fields are private so a window can only be replaced whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct DistributionWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Deserialize)]
struct RawWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TryFrom<RawWindow> for DistributionWindow {
    type Error = WindowError;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.start, raw.end)
    }
}

impl DistributionWindow {
    /// Create a window, rejecting empty or inverted intervals.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if end <= start {
            return Err(WindowError::EmptyOrInverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// Create a window that opens at `start` and lasts `duration`.
    pub fn starting_at(start: DateTime<Utc>, duration: Duration) -> Result<Self, WindowError> {
        if duration <= Duration::zero() {
            return Err(WindowError::NonPositiveDuration);
        }
        Self::new(start, start + duration)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `now` falls inside the inclusive interval.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }
}

/// A document held by the vault.
///
/// `key_material` and `ciphertext_ref` are replaced together, and only
/// together with a version bump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub description: String,
    pub ciphertext_ref: ArtifactRef,
    pub key_material: KeyMaterial,
    pub distribution_window: Option<DistributionWindow>,
    pub version: u32,
    pub uploaded_by: ActorId,
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Build the first version of a document from freshly sealed content.
    pub fn create(
        new: NewDocument,
        ciphertext_ref: ArtifactRef,
        key_material: KeyMaterial,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: DocumentId::generate(),
            title: new.title,
            description: new.description,
            ciphertext_ref,
            key_material,
            distribution_window: None,
            version: 1,
            uploaded_by: new.uploaded_by,
            created_at: now,
        }
    }

    /// Strip key material for display to callers.
    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            distribution_window: self.distribution_window,
            version: self.version,
            uploaded_by: self.uploaded_by.clone(),
            created_at: self.created_at,
        }
    }
}

/// Caller-supplied metadata for a new upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocument {
    pub title: String,
    pub description: String,
    pub uploaded_by: ActorId,
}

impl NewDocument {
    pub fn new(title: impl Into<String>, uploaded_by: ActorId) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            uploaded_by,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Document view without key material or storage location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub id: DocumentId,
    pub title: String,
    pub description: String,
    pub distribution_window: Option<DistributionWindow>,
    pub version: u32,
    pub uploaded_by: ActorId,
    pub created_at: DateTime<Utc>,
}
