//! Error types for the access module.

use chrono::{DateTime, Utc};
use paper_vault_core::DenialReason;
use paper_vault_store::StoreError;
use thiserror::Error;

/// Reasons the gate refuses to admit a request.
#[derive(Debug, Error)]
pub enum AccessError {
    /// No distribution window has been set.
    #[error("paper has not been scheduled for distribution")]
    NotDistributed,

    /// The window has not opened yet.
    #[error("paper is not available until {opens_at}")]
    TooEarly { opens_at: DateTime<Utc> },

    /// The window has closed.
    #[error("distribution window closed at {closed_at}")]
    WindowExpired { closed_at: DateTime<Utc> },

    /// The attempt could not be recorded, so access is refused.
    #[error("access attempt could not be recorded: {0}")]
    AuditUnavailable(#[from] StoreError),
}

impl AccessError {
    /// The window-state reason, if this is a window denial.
    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self {
            AccessError::NotDistributed => Some(DenialReason::NotDistributed),
            AccessError::TooEarly { .. } => Some(DenialReason::TooEarly),
            AccessError::WindowExpired { .. } => Some(DenialReason::WindowExpired),
            AccessError::AuditUnavailable(_) => None,
        }
    }
}

/// Result type for access operations.
pub type Result<T> = std::result::Result<T, AccessError>;
