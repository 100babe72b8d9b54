//! Store traits: the abstract interface for document metadata and audit records.
//!
//! These traits let the vault stay storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use paper_vault_core::{
    AccessAttempt, ArtifactRef, DistributionWindow, Document, DocumentId, KeyMaterial,
};

use crate::error::Result;

/// Async interface for document record persistence.
///
/// # Design Notes
///
/// - **Snapshots**: `get_document` returns an owned copy. Concurrent writers
///   never produce a half-updated record in a snapshot.
/// - **Whole-window writes**: the distribution window is replaced as one
///   value; `start` and `end` are never written separately.
/// - **Content replacement**: key material and ciphertext reference change
///   together, bump `version`, and are guarded by the expected version.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Record Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a new document record.
    ///
    /// Fails with `AlreadyExists` if the id is taken.
    async fn insert_document(&self, document: &Document) -> Result<()>;

    /// Get a document by id.
    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>>;

    /// List all document ids, oldest first.
    async fn list_documents(&self) -> Result<Vec<DocumentId>>;

    /// Remove a document record, returning it if it existed.
    async fn delete_document(&self, id: &DocumentId) -> Result<Option<Document>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────────

    /// Update display metadata. Does not bump `version`.
    async fn update_metadata(
        &self,
        id: &DocumentId,
        title: &str,
        description: &str,
    ) -> Result<Document>;

    /// Replace the distribution window atomically.
    async fn set_distribution_window(
        &self,
        id: &DocumentId,
        window: Option<DistributionWindow>,
    ) -> Result<Document>;

    /// Swap in new content and bump the version.
    ///
    /// Fails with `VersionConflict` unless the stored version equals
    /// `expected_version`.
    async fn replace_content(
        &self,
        id: &DocumentId,
        expected_version: u32,
        ciphertext_ref: &ArtifactRef,
        key_material: &KeyMaterial,
    ) -> Result<Document>;
}

/// Append-only access attempt log.
#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Append one attempt record.
    async fn append_attempt(&self, attempt: &AccessAttempt) -> Result<()>;

    /// All attempts recorded for a document, in append order.
    async fn attempts_for(&self, id: &DocumentId) -> Result<Vec<AccessAttempt>>;
}
