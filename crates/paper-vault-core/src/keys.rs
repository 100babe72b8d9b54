//! Per-document key material.
//!
//! Every sealed document gets its own 256-bit key and 128-bit IV drawn from
//! the thread-local CSPRNG. Nothing here is derived from names, timestamps,
//! or any other predictable input, and nothing is remembered between calls.

use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// IV length in bytes (one AES block).
pub const IV_LEN: usize = 16;

/// A 256-bit symmetric key bound to one ciphertext artifact.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DocumentKey([u8; KEY_LEN]);

impl DocumentKey {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, rejecting anything but exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; KEY_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: KEY_LEN,
            got: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = zeroize::Zeroizing::new(hex::decode(s)?);
        Self::from_slice(&bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

impl fmt::Debug for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DocumentKey(<redacted>)")
    }
}

/// A 128-bit initialization vector.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Iv([u8; IV_LEN]);

impl Iv {
    /// Generate a new random IV.
    pub fn generate() -> Self {
        let mut bytes = [0u8; IV_LEN];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; IV_LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, rejecting anything but exactly 16 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let arr: [u8; IV_LEN] = bytes.try_into().map_err(|_| CryptoError::InvalidIvLength {
            expected: IV_LEN,
            got: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        Self::from_slice(&hex::decode(s)?)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}

impl fmt::Debug for Iv {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Iv(<redacted>)")
    }
}

/// The key/IV pair bound 1:1 to a document's ciphertext.
///
/// Serializes as hex strings so external metadata stores can persist it
/// as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial {
    #[serde(serialize_with = "ser_key", deserialize_with = "de_key")]
    pub key: DocumentKey,
    #[serde(serialize_with = "ser_iv", deserialize_with = "de_iv")]
    pub iv: Iv,
}

impl KeyMaterial {
    /// Mint a fresh key/IV pair.
    pub fn generate() -> Self {
        Self {
            key: DocumentKey::generate(),
            iv: Iv::generate(),
        }
    }

    pub fn new(key: DocumentKey, iv: Iv) -> Self {
        Self { key, iv }
    }

    /// Rebuild from the hex encoding a metadata store persisted.
    pub fn from_hex(key: &str, iv: &str) -> Result<Self, CryptoError> {
        Ok(Self {
            key: DocumentKey::from_hex(key)?,
            iv: Iv::from_hex(iv)?,
        })
    }
}

fn ser_key<S: Serializer>(key: &DocumentKey, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&key.to_hex())
}

fn de_key<'de, D: Deserializer<'de>>(d: D) -> Result<DocumentKey, D::Error> {
    let s = zeroize::Zeroizing::new(String::deserialize(d)?);
    DocumentKey::from_hex(&s).map_err(serde::de::Error::custom)
}

fn ser_iv<S: Serializer>(iv: &Iv, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&iv.to_hex())
}

fn de_iv<'de, D: Deserializer<'de>>(d: D) -> Result<Iv, D::Error> {
    let s = String::deserialize(d)?;
    Iv::from_hex(&s).map_err(serde::de::Error::custom)
}
