//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    // Get current version
    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    // Apply migrations
    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    // Document records and the audit trail
    conn.execute_batch(
        r#"
        -- Document records
        CREATE TABLE documents (
            document_id BLOB PRIMARY KEY,     -- 16 bytes, UUID
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            ciphertext_ref TEXT NOT NULL UNIQUE,
            enc_key BLOB NOT NULL,            -- 32 bytes
            enc_iv BLOB NOT NULL,             -- 16 bytes
            window_start INTEGER,             -- Unix ns, NULL until distributed
            window_end INTEGER,               -- Unix ns, NULL until distributed
            version INTEGER NOT NULL DEFAULT 1,
            uploaded_by TEXT NOT NULL,
            created_at INTEGER NOT NULL,      -- Unix ns
            seq INTEGER NOT NULL,             -- insertion order

            CHECK (length(enc_key) = 32 AND length(enc_iv) = 16),
            CHECK (
                (window_start IS NULL AND window_end IS NULL)
                OR (window_start IS NOT NULL AND window_end IS NOT NULL
                    AND window_start < window_end)
            )
        );

        -- Access attempts, append-only
        CREATE TABLE access_attempts (
            attempt_seq INTEGER PRIMARY KEY AUTOINCREMENT,
            document_id BLOB NOT NULL,
            actor_id TEXT NOT NULL,
            timestamp INTEGER NOT NULL,       -- Unix ns
            outcome TEXT NOT NULL
        );

        CREATE TRIGGER access_attempts_no_update
        BEFORE UPDATE ON access_attempts
        BEGIN
            SELECT RAISE(ABORT, 'access attempts are append-only');
        END;

        CREATE TRIGGER access_attempts_no_delete
        BEFORE DELETE ON access_attempts
        BEGIN
            SELECT RAISE(ABORT, 'access attempts are append-only');
        END;

        -- Indexes for common queries
        CREATE INDEX idx_documents_seq ON documents(seq);
        CREATE INDEX idx_attempts_document ON access_attempts(document_id, attempt_seq);
        "#,
    )?;

    Ok(())
}
