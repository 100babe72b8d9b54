//! The Vault: upload, distribution, and download of sealed documents.
//!
//! The vault ties the pieces together. Content is encrypted into the
//! artifact store on upload; a download passes the access gate, decrypts
//! into an ephemeral file, watermarks into a second ephemeral file, and
//! hands the second one back. The plaintext file is gone before `download`
//! returns.

use std::fs;
use std::io::{self, BufReader, BufWriter, Read};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, instrument, warn};

use paper_vault_access::{AccessWindowGate, WindowState};
use paper_vault_core::{
    AccessAttempt, AccessOutcome, ActorId, ArtifactRef, CryptoVault, DistributionWindow,
    Document, DocumentId, DocumentSummary, KeyMaterial, NewDocument,
};
use paper_vault_render::WatermarkRenderer;
use paper_vault_store::{ArtifactStore, AuditLog, DocumentStore, StoreError};

use crate::config::VaultConfig;
use crate::download::Download;
use crate::ephemeral::{self, EphemeralScope};
use crate::error::{Result, VaultError};

/// Freshly encrypted content, not yet attached to a document record.
#[derive(Debug, Clone)]
pub struct SealedContent {
    pub ciphertext_ref: ArtifactRef,
    pub key_material: KeyMaterial,
    /// Bytes written to the artifact store.
    pub ciphertext_len: u64,
}

/// The document vault.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct Vault<S: DocumentStore + AuditLog> {
    store: Arc<S>,
    gate: AccessWindowGate<S>,
    artifacts: ArtifactStore,
    crypto: CryptoVault,
    renderer: WatermarkRenderer,
    config: VaultConfig,
}

impl<S: DocumentStore + AuditLog + 'static> Vault<S> {
    /// Open a vault over `store`.
    ///
    /// Creates the artifact and scratch directories and removes leftovers
    /// of an earlier process: half-written artifacts and stale ephemeral
    /// files.
    pub fn open(store: S, config: VaultConfig) -> Result<Self> {
        Self::with_shared_store(Arc::new(store), config)
    }

    /// Open a vault over a store that is also used elsewhere.
    pub fn with_shared_store(store: Arc<S>, config: VaultConfig) -> Result<Self> {
        config.validate()?;
        let artifacts = ArtifactStore::open(config.artifact_dir.clone())?;
        fs::create_dir_all(&config.scratch_dir)?;

        let staged = artifacts.sweep_staging()?;
        let stale = ephemeral::sweep_stale(&config.scratch_dir)?;
        if staged + stale > 0 {
            warn!(staged, stale, "removed leftovers of an earlier run");
        }

        Ok(Self {
            gate: AccessWindowGate::new(Arc::clone(&store)),
            store,
            artifacts,
            crypto: CryptoVault::new(config.cipher_suite).with_chunk_size(config.chunk_size),
            renderer: WatermarkRenderer::new(config.watermark),
            config,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Upload
    // ─────────────────────────────────────────────────────────────────────────

    /// Encrypt `raw` under fresh key material into a new artifact.
    ///
    /// Nothing is recorded in the document store; the caller persists the
    /// returned reference and key material.
    pub async fn seal(&self, raw: Vec<u8>) -> Result<SealedContent> {
        self.seal_reader(io::Cursor::new(raw)).await
    }

    /// Like [`seal`](Self::seal), streaming from a reader.
    #[instrument(skip_all, err)]
    pub async fn seal_reader<R: Read + Send + 'static>(&self, reader: R) -> Result<SealedContent> {
        let artifacts = self.artifacts.clone();
        let crypto = self.crypto.clone();
        let sealed = blocking(move || {
            let key_material = KeyMaterial::generate();
            let ciphertext_ref = ArtifactRef::generate();
            let mut staged = artifacts.stage()?;
            let ciphertext_len =
                crypto.encrypt(reader, BufWriter::new(staged.file_mut()), &key_material)?;
            staged.commit(&ciphertext_ref)?;
            Ok(SealedContent {
                ciphertext_ref,
                key_material,
                ciphertext_len,
            })
        })
        .await?;
        debug!(artifact = %sealed.ciphertext_ref, len = sealed.ciphertext_len, "content sealed");
        Ok(sealed)
    }

    /// Seal `raw` and record a new document for it.
    ///
    /// The record is only written once the ciphertext is durable; if the
    /// record cannot be written the ciphertext is erased again.
    #[instrument(skip_all, err, fields(title = %new.title, uploaded_by = %new.uploaded_by))]
    pub async fn upload(&self, new: NewDocument, raw: Vec<u8>) -> Result<DocumentSummary> {
        let sealed = self.seal(raw).await?;
        let document = Document::create(
            new,
            sealed.ciphertext_ref.clone(),
            sealed.key_material,
            Utc::now(),
        );

        if let Err(e) = self.store.insert_document(&document).await {
            self.erase(&sealed.ciphertext_ref).await;
            return Err(e.into());
        }

        info!(document_id = %document.id, "document uploaded");
        Ok(document.summary())
    }

    /// Re-encrypt a document with new content.
    ///
    /// Fresh key material is minted and the version bumped. The superseded
    /// ciphertext is erased once the record points at the new one.
    #[instrument(skip_all, err, fields(document_id = %id))]
    pub async fn replace_content(&self, id: &DocumentId, raw: Vec<u8>) -> Result<DocumentSummary> {
        let current = self.require(id).await?;
        let sealed = self.seal(raw).await?;

        let updated = match self
            .store
            .replace_content(id, current.version, &sealed.ciphertext_ref, &sealed.key_material)
            .await
        {
            Ok(doc) => doc,
            Err(e) => {
                self.erase(&sealed.ciphertext_ref).await;
                return Err(e.into());
            }
        };
        self.erase(&current.ciphertext_ref).await;

        info!(document_id = %id, version = updated.version, "content replaced");
        Ok(updated.summary())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Metadata
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn get_document(&self, id: &DocumentId) -> Result<DocumentSummary> {
        Ok(self.require(id).await?.summary())
    }

    /// All documents, oldest first.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        let mut out = Vec::new();
        for id in self.store.list_documents().await? {
            // Deleted between the listing and the lookup.
            if let Some(doc) = self.store.get_document(&id).await? {
                out.push(doc.summary());
            }
        }
        Ok(out)
    }

    /// Change title and description. The version is unchanged.
    #[instrument(skip_all, err, fields(document_id = %id))]
    pub async fn update_metadata(
        &self,
        id: &DocumentId,
        title: &str,
        description: &str,
    ) -> Result<DocumentSummary> {
        let doc = self.store.update_metadata(id, title, description).await?;
        info!("metadata updated");
        Ok(doc.summary())
    }

    /// Set the distribution window to `[start, end]`.
    ///
    /// Fails with [`VaultError::Window`] unless `end` is after `start`.
    #[instrument(skip_all, err, fields(document_id = %id, %start, %end))]
    pub async fn set_distribution_window(
        &self,
        id: &DocumentId,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DocumentSummary> {
        let window = DistributionWindow::new(start, end)?;
        self.apply_window(id, window).await
    }

    /// Schedule distribution at `start` for the configured default window.
    #[instrument(skip_all, err, fields(document_id = %id, %start))]
    pub async fn distribute(&self, id: &DocumentId, start: DateTime<Utc>) -> Result<DocumentSummary> {
        let window = DistributionWindow::starting_at(start, self.config.default_window)?;
        self.apply_window(id, window).await
    }

    async fn apply_window(
        &self,
        id: &DocumentId,
        window: DistributionWindow,
    ) -> Result<DocumentSummary> {
        let doc = self.store.set_distribution_window(id, Some(window)).await?;
        info!(start = %window.start(), end = %window.end(), "distribution window set");
        Ok(doc.summary())
    }

    /// Remove the record and erase its ciphertext.
    ///
    /// The audit trail of the document is kept.
    #[instrument(skip_all, err, fields(document_id = %id))]
    pub async fn delete(&self, id: &DocumentId) -> Result<DocumentSummary> {
        let removed = self
            .store
            .delete_document(id)
            .await?
            .ok_or(VaultError::NotFound(*id))?;

        let artifacts = self.artifacts.clone();
        let artifact = removed.ciphertext_ref.clone();
        let existed = blocking(move || Ok(artifacts.remove(&artifact)?)).await?;
        if !existed {
            warn!(artifact = %removed.ciphertext_ref, "ciphertext was already missing");
        }

        info!("document deleted");
        Ok(removed.summary())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Access
    // ─────────────────────────────────────────────────────────────────────────

    /// Decrypt and watermark a document for `actor`.
    ///
    /// The gate runs first and records the attempt; a denial returns before
    /// any file is created. Every ephemeral file created after that is
    /// removed on every exit path. If this future is dropped mid-way the
    /// blocking stage still runs to completion and its files are removed.
    #[instrument(skip_all, fields(document_id = %id, actor = %actor, %now))]
    pub async fn download(
        &self,
        id: &DocumentId,
        actor: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<Download> {
        let document = self.require(id).await?;
        self.gate.evaluate(&document, actor, now).await?;

        let scope = EphemeralScope::new(self.config.scratch_dir.clone());
        let request_id = scope.request_id();
        let result = match self.decrypt_and_mark(document.clone(), scope.clone()).await {
            Err(VaultError::Store(StoreError::ArtifactNotFound(_))) => {
                self.retry_replaced(&document, now, scope).await
            }
            other => other,
        };

        match result {
            Ok(download) => {
                info!(%request_id, version = download.version(), pages = download.page_count(), "download ready");
                Ok(download)
            }
            Err(e) => {
                error!(%request_id, error = %e, "download failed after access was granted");
                Err(e)
            }
        }
    }

    /// The ciphertext read by `stale` is gone. If the content was replaced
    /// in the meantime, serve the current version instead.
    async fn retry_replaced(
        &self,
        stale: &Document,
        now: DateTime<Utc>,
        scope: EphemeralScope,
    ) -> Result<Download> {
        let current = self.require(&stale.id).await?;
        if current.ciphertext_ref == stale.ciphertext_ref {
            return Err(StoreError::ArtifactNotFound(current.ciphertext_ref).into());
        }
        if let Some(denial) = WindowState::evaluate(current.distribution_window.as_ref(), now).denial() {
            return Err(denial.into());
        }

        debug!(
            stale_version = stale.version,
            version = current.version,
            "content replaced during download; serving current version"
        );
        self.decrypt_and_mark(current, scope).await
    }

    /// Decrypt into a "plain" ephemeral file, watermark into a "marked" one,
    /// and hand back the marked one. Runs on the blocking pool.
    async fn decrypt_and_mark(&self, document: Document, scope: EphemeralScope) -> Result<Download> {
        let artifacts = self.artifacts.clone();
        let crypto = self.crypto.clone();
        let renderer = self.renderer.clone();
        let marker = self.config.marker_text.clone();

        blocking(move || {
            let ciphertext = artifacts.open_artifact(&document.ciphertext_ref)?;

            let mut plain = scope.create("plain")?;
            crypto.decrypt(
                BufReader::new(ciphertext),
                BufWriter::new(plain.file_mut()?),
                &document.key_material,
            )?;

            let mut marked = scope.create("marked")?;
            let report = renderer.render(
                BufReader::new(plain.reopen()?),
                BufWriter::new(marked.file_mut()?),
                &marker,
            )?;

            if let Err(e) = plain.remove() {
                warn!(request_id = %scope.request_id(), error = %e, "failed to remove decrypted plaintext");
            }

            Ok(Download::new(
                document.id,
                document.version,
                scope.request_id(),
                report.page_count,
                marked,
            )?)
        })
        .await
    }

    /// Evaluate the gate for `actor` and record the attempt without
    /// decrypting anything.
    ///
    /// Denials are returned as outcomes, not errors.
    #[instrument(skip_all, fields(document_id = %id, actor = %actor, %now))]
    pub async fn log_access(
        &self,
        id: &DocumentId,
        actor: &ActorId,
        now: DateTime<Utc>,
    ) -> Result<AccessOutcome> {
        let document = self.require(id).await?;
        match self.gate.evaluate(&document, actor, now).await {
            Ok(_) => Ok(AccessOutcome::Granted),
            Err(e) => match e.denial_reason() {
                Some(reason) => Ok(AccessOutcome::Denied(reason)),
                None => Err(e.into()),
            },
        }
    }

    /// Every recorded access attempt for a document, oldest first.
    pub async fn access_attempts(&self, id: &DocumentId) -> Result<Vec<AccessAttempt>> {
        Ok(self.store.attempts_for(id).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Helpers
    // ─────────────────────────────────────────────────────────────────────────

    async fn require(&self, id: &DocumentId) -> Result<Document> {
        self.store
            .get_document(id)
            .await?
            .ok_or(VaultError::NotFound(*id))
    }

    /// Erase an artifact, logging instead of failing.
    async fn erase(&self, artifact: &ArtifactRef) {
        let artifacts = self.artifacts.clone();
        let target = artifact.clone();
        if let Err(e) = blocking(move || Ok(artifacts.remove(&target)?)).await {
            warn!(artifact = %artifact, error = %e, "failed to erase ciphertext");
        }
    }
}

/// Run blocking file and crypto work off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VaultError::Task(e.to_string()))?
}
