//! In-memory implementation of the store traits.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use paper_vault_core::{
    AccessAttempt, ArtifactRef, DistributionWindow, Document, DocumentId, KeyMaterial,
};

use crate::error::{Result, StoreError};
use crate::traits::{AuditLog, DocumentStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Documents indexed by id.
    documents: HashMap<DocumentId, Document>,

    /// Insertion order, for listing.
    order: Vec<DocumentId>,

    /// Audit log, append-only.
    attempts: Vec<AccessAttempt>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }

    /// Apply `f` to a stored document under the write lock.
    fn modify<F>(&self, id: &DocumentId, f: F) -> Result<Document>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        let mut inner = self.write()?;
        let doc = inner
            .documents
            .get_mut(id)
            .ok_or(StoreError::NotFound(*id))?;
        f(doc)?;
        Ok(doc.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_document(&self, document: &Document) -> Result<()> {
        let mut inner = self.write()?;
        if inner.documents.contains_key(&document.id) {
            return Err(StoreError::AlreadyExists(document.id));
        }
        inner.documents.insert(document.id, document.clone());
        inner.order.push(document.id);
        Ok(())
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        let inner = self.read()?;
        Ok(inner.documents.get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentId>> {
        let inner = self.read()?;
        Ok(inner.order.clone())
    }

    async fn delete_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        let mut inner = self.write()?;
        let removed = inner.documents.remove(id);
        if removed.is_some() {
            inner.order.retain(|d| d != id);
        }
        Ok(removed)
    }

    async fn update_metadata(
        &self,
        id: &DocumentId,
        title: &str,
        description: &str,
    ) -> Result<Document> {
        self.modify(id, |doc| {
            doc.title = title.to_string();
            doc.description = description.to_string();
            Ok(())
        })
    }

    async fn set_distribution_window(
        &self,
        id: &DocumentId,
        window: Option<DistributionWindow>,
    ) -> Result<Document> {
        self.modify(id, |doc| {
            doc.distribution_window = window;
            Ok(())
        })
    }

    async fn replace_content(
        &self,
        id: &DocumentId,
        expected_version: u32,
        ciphertext_ref: &ArtifactRef,
        key_material: &KeyMaterial,
    ) -> Result<Document> {
        self.modify(id, |doc| {
            if doc.version != expected_version {
                return Err(StoreError::VersionConflict {
                    id: *id,
                    expected: expected_version,
                    found: doc.version,
                });
            }
            doc.ciphertext_ref = ciphertext_ref.clone();
            doc.key_material = key_material.clone();
            doc.version += 1;
            Ok(())
        })
    }
}

#[async_trait]
impl AuditLog for MemoryStore {
    async fn append_attempt(&self, attempt: &AccessAttempt) -> Result<()> {
        let mut inner = self.write()?;
        inner.attempts.push(attempt.clone());
        Ok(())
    }

    async fn attempts_for(&self, id: &DocumentId) -> Result<Vec<AccessAttempt>> {
        let inner = self.read()?;
        Ok(inner
            .attempts
            .iter()
            .filter(|a| &a.document_id == id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use paper_vault_core::{AccessOutcome, ActorId, DenialReason, NewDocument};

    fn make_document() -> Document {
        Document::create(
            NewDocument::new("Chemistry Paper II", ActorId::from("examiner-1")),
            ArtifactRef::generate(),
            KeyMaterial::generate(),
            Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryStore::new();
        let doc = make_document();

        store.insert_document(&doc).await.unwrap();
        let retrieved = store.get_document(&doc.id).await.unwrap().unwrap();
        assert_eq!(retrieved, doc);
        assert_eq!(store.list_documents().await.unwrap(), vec![doc.id]);
    }

    #[tokio::test]
    async fn test_memory_store_duplicate_insert() {
        let store = MemoryStore::new();
        let doc = make_document();
        store.insert_document(&doc).await.unwrap();
        assert!(matches!(
            store.insert_document(&doc).await,
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_metadata_edit_keeps_version() {
        let store = MemoryStore::new();
        let doc = make_document();
        store.insert_document(&doc).await.unwrap();

        let updated = store
            .update_metadata(&doc.id, "Chemistry Paper II (revised)", "two hours")
            .await
            .unwrap();
        assert_eq!(updated.version, 1);
        assert_eq!(updated.description, "two hours");
    }

    #[tokio::test]
    async fn test_replace_content_bumps_version() {
        let store = MemoryStore::new();
        let doc = make_document();
        store.insert_document(&doc).await.unwrap();

        let new_ref = ArtifactRef::generate();
        let new_keys = KeyMaterial::generate();
        let updated = store
            .replace_content(&doc.id, 1, &new_ref, &new_keys)
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.ciphertext_ref, new_ref);
        assert_eq!(updated.key_material, new_keys);

        let stale = store
            .replace_content(&doc.id, 1, &ArtifactRef::generate(), &KeyMaterial::generate())
            .await;
        assert!(matches!(
            stale,
            Err(StoreError::VersionConflict { expected: 1, found: 2, .. })
        ));
    }

    #[tokio::test]
    async fn test_set_window_and_delete() {
        let store = MemoryStore::new();
        let doc = make_document();
        store.insert_document(&doc).await.unwrap();

        let start = Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0).unwrap();
        let window = DistributionWindow::starting_at(start, Duration::hours(2)).unwrap();
        let updated = store
            .set_distribution_window(&doc.id, Some(window))
            .await
            .unwrap();
        assert_eq!(updated.distribution_window, Some(window));

        let removed = store.delete_document(&doc.id).await.unwrap();
        assert!(removed.is_some());
        assert!(store.get_document(&doc.id).await.unwrap().is_none());
        assert!(matches!(
            store.set_distribution_window(&doc.id, None).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_audit_log_filters_by_document() {
        let store = MemoryStore::new();
        let a = DocumentId::generate();
        let b = DocumentId::generate();
        let now = Utc::now();

        store
            .append_attempt(&AccessAttempt::new(a, "u1".into(), now, AccessOutcome::Granted))
            .await
            .unwrap();
        store
            .append_attempt(&AccessAttempt::new(
                b,
                "u2".into(),
                now,
                AccessOutcome::Denied(DenialReason::TooEarly),
            ))
            .await
            .unwrap();

        let for_a = store.attempts_for(&a).await.unwrap();
        assert_eq!(for_a.len(), 1);
        assert!(for_a[0].outcome.is_granted());
    }
}
