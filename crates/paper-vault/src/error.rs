//! Error types for the vault.

use std::path::PathBuf;

use paper_vault_access::AccessError;
use paper_vault_core::{CryptoError, DocumentId, WindowError};
use paper_vault_render::RenderError;
use paper_vault_store::StoreError;
use thiserror::Error;

/// Message returned to callers for failures whose detail stays in the logs.
pub const GENERIC_FAILURE: &str = "the request could not be completed";

/// Errors creating or removing ephemeral artifacts.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to create ephemeral {stage} artifact in {dir}: {source}")]
    Create {
        stage: &'static str,
        dir: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to remove ephemeral artifact {path}: {source}")]
    Remove {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Errors that can occur during vault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// No document with this id.
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// The gate refused the request.
    #[error("access denied: {0}")]
    Access(#[from] AccessError),

    /// A distribution window was rejected.
    #[error("invalid distribution window: {0}")]
    Window(#[from] WindowError),

    /// Encryption or decryption failed.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Watermarking failed.
    #[error("render error: {0}")]
    Render(#[from] RenderError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Ephemeral artifact handling failed.
    #[error("ephemeral artifact error: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Configuration rejected at startup.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for VaultError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(id) => VaultError::NotFound(id),
            other => VaultError::Store(other),
        }
    }
}

impl VaultError {
    /// Whether this is a window-state denial.
    pub fn is_denial(&self) -> bool {
        matches!(self, VaultError::Access(e) if e.denial_reason().is_some())
    }

    /// Text safe to show the requester.
    ///
    /// Window denials and input errors carry their reason. Everything else
    /// collapses to [`GENERIC_FAILURE`].
    pub fn client_message(&self) -> String {
        match self {
            VaultError::Access(e) if e.denial_reason().is_some() => e.to_string(),
            VaultError::NotFound(_) => "document not found".to_string(),
            VaultError::Window(e) => e.to_string(),
            _ => GENERIC_FAILURE.to_string(),
        }
    }
}

/// Result type for vault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_denials_keep_their_reason() {
        let closed_at = Utc.with_ymd_and_hms(2026, 6, 1, 11, 0, 0).unwrap();
        let err = VaultError::from(AccessError::WindowExpired { closed_at });
        assert!(err.is_denial());
        assert!(err.client_message().contains("closed"));

        let err = VaultError::from(AccessError::NotDistributed);
        assert_eq!(err.client_message(), AccessError::NotDistributed.to_string());
    }

    #[test]
    fn test_internal_errors_are_generic() {
        let err = VaultError::from(CryptoError::IntegrityCheckFailed);
        assert!(!err.is_denial());
        assert_eq!(err.client_message(), GENERIC_FAILURE);

        let err = VaultError::from(AccessError::AuditUnavailable(StoreError::Poisoned));
        assert!(!err.is_denial());
        assert_eq!(err.client_message(), GENERIC_FAILURE);
    }

    #[test]
    fn test_store_not_found_maps_to_not_found() {
        let id = DocumentId::generate();
        let err = VaultError::from(StoreError::NotFound(id));
        assert!(matches!(err, VaultError::NotFound(got) if got == id));
        assert_eq!(err.client_message(), "document not found");
    }
}
