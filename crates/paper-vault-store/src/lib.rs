//! # Paper Vault Store
//!
//! Storage abstraction for Paper Vault. Provides trait-based interfaces for
//! document metadata and the access audit log, with SQLite and in-memory
//! implementations, plus filesystem storage for ciphertext artifacts.
//!
//! ## Key Types
//!
//! - [`DocumentStore`] - Async trait for document record persistence
//! - [`AuditLog`] - Async trait for the append-only access attempt log
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`ArtifactStore`] - Directory of ciphertext artifacts with staged, atomic writes
//!
//! ## Usage
//!
//! ```rust,no_run
//! use paper_vault_store::{ArtifactStore, DocumentStore, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("vault.db").unwrap();
//!     let artifacts = ArtifactStore::open("artifacts").unwrap();
//!
//!     for id in store.list_documents().await.unwrap() {
//!         let doc = store.get_document(&id).await.unwrap().unwrap();
//!         assert!(artifacts.exists(&doc.ciphertext_ref));
//!     }
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Whole-window writes**: a distribution window is stored and replaced as one value
//! - **Append-only audit**: SQLite triggers reject updates and deletes of attempts
//! - **No partial ciphertext**: artifacts become visible only after a synced, no-clobber rename

pub mod artifact;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use artifact::{ArtifactStore, StagedArtifact};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{AuditLog, DocumentStore};
