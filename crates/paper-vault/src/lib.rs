//! # Paper Vault
//!
//! Encrypted storage for exam papers that can only be read inside their
//! distribution window, and only as a watermarked copy.
//!
//! ## Overview
//!
//! - **Upload**: content is encrypted under fresh per-document key material
//!   (AES-256-CBC) and written atomically to the artifact store.
//! - **Distribution**: a `{start, end}` window is set on the document.
//! - **Download**: the access gate checks the window and records the
//!   attempt, the ciphertext is decrypted into an ephemeral file, every page
//!   is watermarked into a second ephemeral file, and that file is handed to
//!   the caller. Ephemeral files are request-scoped and always removed.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::{Duration, Utc};
//! use paper_vault::{Vault, VaultConfig};
//! use paper_vault::core::{ActorId, NewDocument};
//! use paper_vault::store::SqliteStore;
//!
//! async fn example() {
//!     let store = SqliteStore::open("vault.db").unwrap();
//!     let vault = Vault::open(store, VaultConfig::rooted_at("/var/lib/paper-vault")).unwrap();
//!
//!     let paper = NewDocument::new("Chemistry Paper I", ActorId::from("examiner"));
//!     let summary = vault.upload(paper, std::fs::read("paper.pdf").unwrap()).await.unwrap();
//!
//!     let start = Utc::now();
//!     vault.distribute(&summary.id, start).await.unwrap();
//!
//!     let download = vault
//!         .download(&summary.id, &ActorId::from("centre-42"), start + Duration::minutes(5))
//!         .await
//!         .unwrap();
//!     println!("{} pages, {} bytes", download.page_count(), download.len());
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `paper_vault::core` - Documents, key material, streaming cipher
//! - `paper_vault::store` - Document store, audit log, artifact store
//! - `paper_vault::access` - Distribution window gate
//! - `paper_vault::render` - PDF watermarking

pub mod config;
pub mod download;
pub mod ephemeral;
pub mod error;
pub mod vault;

// Re-export component crates
pub use paper_vault_access as access;
pub use paper_vault_core as core;
pub use paper_vault_render as render;
pub use paper_vault_store as store;

pub use config::VaultConfig;
pub use download::Download;
pub use ephemeral::{EphemeralArtifact, EphemeralScope};
pub use error::{LifecycleError, Result, VaultError};
pub use vault::{SealedContent, Vault};

// Commonly used core types
pub use paper_vault_access::AccessError;
pub use paper_vault_core::{
    AccessAttempt, AccessOutcome, ActorId, CipherSuite, DenialReason, DistributionWindow,
    DocumentId, DocumentSummary, NewDocument,
};
