//! Window state computation.
//!
//! The state is never stored. It is recomputed from the stored window and
//! the clock on every evaluation, so a window edited between two requests
//! is always seen as it is now.

use chrono::{DateTime, Utc};

use paper_vault_core::{AccessOutcome, DenialReason, DistributionWindow};

use crate::error::AccessError;

/// Where "now" falls relative to a document's distribution window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    /// No window set.
    Undistributed,
    /// `now < start`.
    Pending { opens_at: DateTime<Utc> },
    /// `start <= now <= end`.
    Open { closes_at: DateTime<Utc> },
    /// `now > end`.
    Closed { closed_at: DateTime<Utc> },
}

impl WindowState {
    /// Evaluate a window against the current time.
    pub fn evaluate(window: Option<&DistributionWindow>, now: DateTime<Utc>) -> Self {
        match window {
            None => WindowState::Undistributed,
            Some(w) if now < w.start() => WindowState::Pending {
                opens_at: w.start(),
            },
            Some(w) if now > w.end() => WindowState::Closed { closed_at: w.end() },
            Some(w) => WindowState::Open { closes_at: w.end() },
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, WindowState::Open { .. })
    }

    /// The audit outcome for this state.
    pub fn outcome(&self) -> AccessOutcome {
        match self {
            WindowState::Open { .. } => AccessOutcome::Granted,
            WindowState::Undistributed => AccessOutcome::Denied(DenialReason::NotDistributed),
            WindowState::Pending { .. } => AccessOutcome::Denied(DenialReason::TooEarly),
            WindowState::Closed { .. } => AccessOutcome::Denied(DenialReason::WindowExpired),
        }
    }

    /// The denial for a non-open state, `None` when open.
    pub fn denial(&self) -> Option<AccessError> {
        match *self {
            WindowState::Open { .. } => None,
            WindowState::Undistributed => Some(AccessError::NotDistributed),
            WindowState::Pending { opens_at } => Some(AccessError::TooEarly { opens_at }),
            WindowState::Closed { closed_at } => Some(AccessError::WindowExpired { closed_at }),
        }
    }
}
