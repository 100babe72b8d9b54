//! Access attempt records.
//!
//! An [`AccessAttempt`] is written for every gate evaluation, granted or
//! denied. Records are append-only: nothing in the vault mutates or deletes
//! them once written.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ActorId, DocumentId};

/// Why the gate refused access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No distribution window has been set.
    NotDistributed,
    /// The window has not opened yet.
    TooEarly,
    /// The window has closed.
    WindowExpired,
}

impl DenialReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NotDistributed => "not_distributed",
            DenialReason::TooEarly => "too_early",
            DenialReason::WindowExpired => "window_expired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "not_distributed" => Some(DenialReason::NotDistributed),
            "too_early" => Some(DenialReason::TooEarly),
            "window_expired" => Some(DenialReason::WindowExpired),
            _ => None,
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "reason")]
pub enum AccessOutcome {
    Granted,
    Denied(DenialReason),
}

impl AccessOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessOutcome::Granted)
    }

    /// Stable textual form used by persistent audit logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessOutcome::Granted => "granted",
            AccessOutcome::Denied(reason) => reason.as_str(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "granted" => Some(AccessOutcome::Granted),
            other => DenialReason::parse(other).map(AccessOutcome::Denied),
        }
    }
}

/// Immutable audit record of a gate evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessAttempt {
    pub document_id: DocumentId,
    pub actor_id: ActorId,
    pub timestamp: DateTime<Utc>,
    pub outcome: AccessOutcome,
}

impl AccessAttempt {
    pub fn new(
        document_id: DocumentId,
        actor_id: ActorId,
        timestamp: DateTime<Utc>,
        outcome: AccessOutcome,
    ) -> Self {
        Self {
            document_id,
            actor_id,
            timestamp,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_text_roundtrip() {
        for outcome in [
            AccessOutcome::Granted,
            AccessOutcome::Denied(DenialReason::NotDistributed),
            AccessOutcome::Denied(DenialReason::TooEarly),
            AccessOutcome::Denied(DenialReason::WindowExpired),
        ] {
            assert_eq!(AccessOutcome::parse(outcome.as_str()), Some(outcome));
        }
        assert_eq!(AccessOutcome::parse("forbidden"), None);
    }

    #[test]
    fn test_outcome_json_shape() {
        let json =
            serde_json::to_string(&AccessOutcome::Denied(DenialReason::WindowExpired)).unwrap();
        assert_eq!(json, r#"{"outcome":"denied","reason":"window_expired"}"#);
    }
}
