//! The access window gate.
//!
//! The gate decides whether a document may be decrypted right now and
//! records every decision in the audit log before returning it. It holds no
//! key material; callers must pass the gate before asking the cipher for
//! plaintext.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use paper_vault_core::{AccessAttempt, ActorId, Document, DocumentId};
use paper_vault_store::AuditLog;

use crate::error::{AccessError, Result};
use crate::state::WindowState;

/// Proof that the gate admitted a request.
///
/// Only the gate can construct one.
#[derive(Debug, Clone)]
pub struct Admission {
    document_id: DocumentId,
    actor_id: ActorId,
    admitted_at: DateTime<Utc>,
    closes_at: DateTime<Utc>,
}

impl Admission {
    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    pub fn actor_id(&self) -> &ActorId {
        &self.actor_id
    }

    pub fn admitted_at(&self) -> DateTime<Utc> {
        self.admitted_at
    }

    /// When the window this admission was granted under closes.
    pub fn closes_at(&self) -> DateTime<Utc> {
        self.closes_at
    }
}

/// Evaluates distribution windows and audits every evaluation.
pub struct AccessWindowGate<A: AuditLog + ?Sized> {
    audit: Arc<A>,
}

impl<A: AuditLog + ?Sized> Clone for AccessWindowGate<A> {
    fn clone(&self) -> Self {
        Self {
            audit: Arc::clone(&self.audit),
        }
    }
}

impl<A: AuditLog + ?Sized> AccessWindowGate<A> {
    pub fn new(audit: Arc<A>) -> Self {
        Self { audit }
    }

    /// Decide whether `actor` may decrypt `document` at `now`.
    ///
    /// The attempt is appended to the audit log first. If that append
    /// fails the request is refused with `AuditUnavailable`, even when the
    /// window is open.
    pub async fn evaluate(
        &self,
        document: &Document,
        actor: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        let state = WindowState::evaluate(document.distribution_window.as_ref(), now);
        let outcome = state.outcome();
        let attempt = AccessAttempt::new(document.id, actor.clone(), now, outcome);

        if let Err(e) = self.audit.append_attempt(&attempt).await {
            warn!(
                document_id = %document.id,
                actor = %actor,
                outcome = outcome.as_str(),
                error = %e,
                "failed to record access attempt; refusing access"
            );
            return Err(AccessError::AuditUnavailable(e));
        }

        match state {
            WindowState::Open { closes_at } => {
                info!(document_id = %document.id, actor = %actor, "access granted");
                Ok(Admission {
                    document_id: document.id,
                    actor_id: actor.clone(),
                    admitted_at: now,
                    closes_at,
                })
            }
            other => {
                warn!(
                    document_id = %document.id,
                    actor = %actor,
                    outcome = outcome.as_str(),
                    "access denied"
                );
                // Non-open states always carry a denial.
                Err(other.denial().unwrap_or(AccessError::NotDistributed))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};
    use paper_vault_core::{
        AccessOutcome, ArtifactRef, DenialReason, DistributionWindow, KeyMaterial, NewDocument,
    };
    use paper_vault_store::{MemoryStore, StoreError};

    fn t() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap()
    }

    fn document(window: Option<DistributionWindow>) -> Document {
        let mut doc = Document::create(
            NewDocument::new("Economics Paper I", ActorId::from("examiner")),
            ArtifactRef::generate(),
            KeyMaterial::generate(),
            t() - Duration::days(7),
        );
        doc.distribution_window = window;
        doc
    }

    struct BrokenAudit;

    #[async_trait]
    impl AuditLog for BrokenAudit {
        async fn append_attempt(&self, _attempt: &AccessAttempt) -> paper_vault_store::Result<()> {
            Err(StoreError::Poisoned)
        }

        async fn attempts_for(
            &self,
            _id: &DocumentId,
        ) -> paper_vault_store::Result<Vec<AccessAttempt>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_every_evaluation_is_audited() {
        let store = Arc::new(MemoryStore::new());
        let gate = AccessWindowGate::new(Arc::clone(&store));
        let window = DistributionWindow::starting_at(t(), Duration::hours(2)).unwrap();
        let doc = document(Some(window));
        let actor = ActorId::from("reviewer-7");

        assert!(matches!(
            gate.evaluate(&doc, &actor, t() - Duration::hours(1)).await,
            Err(AccessError::TooEarly { .. })
        ));
        let admission = gate
            .evaluate(&doc, &actor, t() + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(admission.document_id(), doc.id);
        assert_eq!(admission.closes_at(), t() + Duration::hours(2));
        assert!(matches!(
            gate.evaluate(&doc, &actor, t() + Duration::hours(3)).await,
            Err(AccessError::WindowExpired { .. })
        ));

        let outcomes: Vec<_> = store
            .attempts_for(&doc.id)
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.outcome)
            .collect();
        assert_eq!(
            outcomes,
            vec![
                AccessOutcome::Denied(DenialReason::TooEarly),
                AccessOutcome::Granted,
                AccessOutcome::Denied(DenialReason::WindowExpired),
            ]
        );
    }

    #[tokio::test]
    async fn test_undistributed_denied() {
        let store = Arc::new(MemoryStore::new());
        let gate = AccessWindowGate::new(Arc::clone(&store));
        let doc = document(None);

        let err = gate
            .evaluate(&doc, &ActorId::from("reviewer"), t())
            .await
            .unwrap_err();
        assert_eq!(err.denial_reason(), Some(DenialReason::NotDistributed));
        assert_eq!(store.attempts_for(&doc.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_audit_failure_fails_closed() {
        let gate = AccessWindowGate::new(Arc::new(BrokenAudit));
        let window = DistributionWindow::starting_at(t(), Duration::hours(2)).unwrap();
        let doc = document(Some(window));

        let err = gate
            .evaluate(&doc, &ActorId::from("reviewer"), t() + Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(matches!(err, AccessError::AuditUnavailable(_)));
        assert!(err.denial_reason().is_none());
    }
}
