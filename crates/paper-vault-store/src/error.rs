//! Error types for the store module.

use paper_vault_core::{ArtifactRef, DocumentId};
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Document not found.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// A document with this id already exists.
    #[error("document already exists: {0}")]
    AlreadyExists(DocumentId),

    /// Content replacement raced with another replacement.
    #[error("version conflict on {id}: expected {expected}, found {found}")]
    VersionConflict {
        id: DocumentId,
        expected: u32,
        found: u32,
    },

    /// Ciphertext artifact missing from storage.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(ArtifactRef),

    /// An artifact with this reference already exists.
    #[error("artifact already exists: {0}")]
    ArtifactExists(ArtifactRef),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// Internal lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,

    /// Blocking task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
