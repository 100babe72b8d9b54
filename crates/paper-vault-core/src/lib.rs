//! # Paper Vault Core
//!
//! Pure primitives for Paper Vault: documents, distribution windows, key
//! material, and the streaming cipher.
//!
//! This crate does no storage and no scheduling. Its only I/O is the
//! caller-supplied reader and writer handed to [`CryptoVault`].
//!
//! ## Key Types
//!
//! - [`Document`] - A stored paper: metadata, ciphertext reference, key material
//! - [`DistributionWindow`] - The `{start, end}` interval during which decryption is allowed
//! - [`KeyMaterial`] - Per-document AES-256 key and 128-bit IV
//! - [`CryptoVault`] - Streaming AES-256-CBC encrypt/decrypt
//! - [`AccessAttempt`] - Append-only audit record of a gate evaluation

pub mod audit;
pub mod crypto;
pub mod document;
pub mod error;
pub mod keys;
pub mod types;

pub use audit::{AccessAttempt, AccessOutcome, DenialReason};
pub use crypto::{CipherSuite, CryptoVault, BLOCK_LEN, DEFAULT_CHUNK_SIZE, TAG_LEN};
pub use document::{DistributionWindow, Document, DocumentSummary, NewDocument};
pub use error::{CryptoError, WindowError};
pub use keys::{DocumentKey, Iv, KeyMaterial, IV_LEN, KEY_LEN};
pub use types::{ActorId, ArtifactRef, DocumentId, InvalidArtifactRef};
