//! SQLite implementation of the store traits.
//!
//! This is the primary metadata backend for Paper Vault. It uses rusqlite
//! with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use paper_vault_core::{
    AccessAttempt, AccessOutcome, ActorId, ArtifactRef, DistributionWindow, Document,
    DocumentId, DocumentKey, Iv, KeyMaterial,
};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{AuditLog, DocumentStore};

const DOCUMENT_COLUMNS: &str = "document_id, title, description, ciphertext_ref, enc_key, \
     enc_iv, window_start, window_end, version, uploaded_by, created_at";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

/// Instants are stored as nanoseconds since the Unix epoch.
fn to_nanos(at: DateTime<Utc>) -> Result<i64> {
    at.timestamp_nanos_opt()
        .ok_or_else(|| StoreError::InvalidData(format!("timestamp out of range: {}", at)))
}

fn from_nanos(nanos: i64) -> DateTime<Utc> {
    Utc.timestamp_nanos(nanos)
}

fn window_nanos(window: Option<DistributionWindow>) -> Result<(Option<i64>, Option<i64>)> {
    match window {
        Some(w) => Ok((Some(to_nanos(w.start())?), Some(to_nanos(w.end())?))),
        None => Ok((None, None)),
    }
}

fn conversion<E>(idx: usize, ty: Type) -> impl FnOnce(E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    move |e| rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(e))
}

// Helper to convert a row to Document
fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    let id_bytes: Vec<u8> = row.get(0)?;
    let ciphertext_ref: String = row.get(3)?;
    let key_bytes: Vec<u8> = row.get(4)?;
    let iv_bytes: Vec<u8> = row.get(5)?;
    let window_start: Option<i64> = row.get(6)?;
    let window_end: Option<i64> = row.get(7)?;
    let uploaded_by: String = row.get(9)?;

    let distribution_window = match (window_start, window_end) {
        (Some(start), Some(end)) => Some(
            DistributionWindow::new(from_nanos(start), from_nanos(end))
                .map_err(conversion(6, Type::Integer))?,
        ),
        (None, None) => None,
        _ => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                6,
                Type::Null,
                "half-set distribution window".into(),
            ))
        }
    };

    Ok(Document {
        id: DocumentId(Uuid::from_slice(&id_bytes).map_err(conversion(0, Type::Blob))?),
        title: row.get(1)?,
        description: row.get(2)?,
        ciphertext_ref: ArtifactRef::new(ciphertext_ref).map_err(conversion(3, Type::Text))?,
        key_material: KeyMaterial::new(
            DocumentKey::from_slice(&key_bytes).map_err(conversion(4, Type::Blob))?,
            Iv::from_slice(&iv_bytes).map_err(conversion(5, Type::Blob))?,
        ),
        distribution_window,
        version: row.get(8)?,
        uploaded_by: ActorId(uploaded_by),
        created_at: from_nanos(row.get(10)?),
    })
}

fn load_document(conn: &Connection, id: &DocumentId) -> Result<Option<Document>> {
    let sql = format!("SELECT {} FROM documents WHERE document_id = ?1", DOCUMENT_COLUMNS);
    conn.query_row(&sql, params![id.as_bytes().as_slice()], row_to_document)
        .optional()
        .map_err(StoreError::from)
}

fn reload(conn: &Connection, id: &DocumentId) -> Result<Document> {
    load_document(conn, id)?.ok_or(StoreError::NotFound(*id))
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn insert_document(&self, document: &Document) -> Result<()> {
        let doc = document.clone();

        self.run(move |conn| {
            let exists: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM documents WHERE document_id = ?1",
                    params![doc.id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_some() {
                return Err(StoreError::AlreadyExists(doc.id));
            }

            let (window_start, window_end) = window_nanos(doc.distribution_window)?;
            conn.execute(
                "INSERT INTO documents (
                    document_id, title, description, ciphertext_ref, enc_key, enc_iv,
                    window_start, window_end, version, uploaded_by, created_at, seq
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                    (SELECT COALESCE(MAX(seq), 0) + 1 FROM documents))",
                params![
                    doc.id.as_bytes().as_slice(),
                    doc.title,
                    doc.description,
                    doc.ciphertext_ref.as_str(),
                    doc.key_material.key.as_bytes().as_slice(),
                    doc.key_material.iv.as_bytes().as_slice(),
                    window_start,
                    window_end,
                    doc.version,
                    doc.uploaded_by.as_str(),
                    to_nanos(doc.created_at)?,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        let id = *id;
        self.run(move |conn| load_document(conn, &id)).await
    }

    async fn list_documents(&self) -> Result<Vec<DocumentId>> {
        self.run(|conn| {
            let mut stmt = conn.prepare("SELECT document_id FROM documents ORDER BY seq")?;
            let ids = stmt
                .query_map([], |row| {
                    let bytes: Vec<u8> = row.get(0)?;
                    Uuid::from_slice(&bytes)
                        .map(DocumentId)
                        .map_err(conversion(0, Type::Blob))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(ids)
        })
        .await
    }

    async fn delete_document(&self, id: &DocumentId) -> Result<Option<Document>> {
        let id = *id;
        self.run(move |conn| {
            let tx = conn.transaction()?;
            let existing = load_document(&tx, &id)?;
            if existing.is_some() {
                tx.execute(
                    "DELETE FROM documents WHERE document_id = ?1",
                    params![id.as_bytes().as_slice()],
                )?;
            }
            tx.commit()?;
            Ok(existing)
        })
        .await
    }

    async fn update_metadata(
        &self,
        id: &DocumentId,
        title: &str,
        description: &str,
    ) -> Result<Document> {
        let id = *id;
        let title = title.to_string();
        let description = description.to_string();

        self.run(move |conn| {
            let changed = conn.execute(
                "UPDATE documents SET title = ?2, description = ?3 WHERE document_id = ?1",
                params![id.as_bytes().as_slice(), title, description],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            reload(conn, &id)
        })
        .await
    }

    async fn set_distribution_window(
        &self,
        id: &DocumentId,
        window: Option<DistributionWindow>,
    ) -> Result<Document> {
        let id = *id;
        let (window_start, window_end) = window_nanos(window)?;

        self.run(move |conn| {
            // Both bounds in one statement: readers never see a mixed window.
            let changed = conn.execute(
                "UPDATE documents SET window_start = ?2, window_end = ?3 WHERE document_id = ?1",
                params![
                    id.as_bytes().as_slice(),
                    window_start,
                    window_end,
                ],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            reload(conn, &id)
        })
        .await
    }

    async fn replace_content(
        &self,
        id: &DocumentId,
        expected_version: u32,
        ciphertext_ref: &ArtifactRef,
        key_material: &KeyMaterial,
    ) -> Result<Document> {
        let id = *id;
        let ciphertext_ref = ciphertext_ref.clone();
        let key_material = key_material.clone();

        self.run(move |conn| {
            let tx = conn.transaction()?;
            let found: Option<u32> = tx
                .query_row(
                    "SELECT version FROM documents WHERE document_id = ?1",
                    params![id.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            let found = found.ok_or(StoreError::NotFound(id))?;
            if found != expected_version {
                return Err(StoreError::VersionConflict {
                    id,
                    expected: expected_version,
                    found,
                });
            }

            tx.execute(
                "UPDATE documents
                 SET ciphertext_ref = ?2, enc_key = ?3, enc_iv = ?4, version = version + 1
                 WHERE document_id = ?1",
                params![
                    id.as_bytes().as_slice(),
                    ciphertext_ref.as_str(),
                    key_material.key.as_bytes().as_slice(),
                    key_material.iv.as_bytes().as_slice(),
                ],
            )?;
            let updated = reload(&tx, &id)?;
            tx.commit()?;
            Ok(updated)
        })
        .await
    }
}

#[async_trait]
impl AuditLog for SqliteStore {
    async fn append_attempt(&self, attempt: &AccessAttempt) -> Result<()> {
        let attempt = attempt.clone();
        let timestamp = to_nanos(attempt.timestamp)?;

        self.run(move |conn| {
            conn.execute(
                "INSERT INTO access_attempts (document_id, actor_id, timestamp, outcome)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    attempt.document_id.as_bytes().as_slice(),
                    attempt.actor_id.as_str(),
                    timestamp,
                    attempt.outcome.as_str(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn attempts_for(&self, id: &DocumentId) -> Result<Vec<AccessAttempt>> {
        let id = *id;

        self.run(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT actor_id, timestamp, outcome FROM access_attempts
                 WHERE document_id = ?1 ORDER BY attempt_seq",
            )?;
            let rows = stmt
                .query_map(params![id.as_bytes().as_slice()], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        from_nanos(row.get(1)?),
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            rows.into_iter()
                .map(|(actor, timestamp, outcome)| {
                    let outcome = AccessOutcome::parse(&outcome).ok_or_else(|| {
                        StoreError::InvalidData(format!("unknown outcome: {}", outcome))
                    })?;
                    Ok(AccessAttempt::new(id, ActorId(actor), timestamp, outcome))
                })
                .collect()
        })
        .await
    }
}
