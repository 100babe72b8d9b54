//! Strong type definitions for Paper Vault.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque, immutable identifier of a document, assigned at creation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub Uuid);

impl DocumentId {
    /// Mint a fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }

    /// Parse from the hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({})", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of the requester, supplied by the external identity provider.
///
/// The vault performs no role logic on it; it is carried into audit records.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Opaque reference to a ciphertext artifact at rest.
///
/// A reference is a single file name: no separators, no parent components,
/// so it can never address anything outside the artifact directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ArtifactRef(String);

impl ArtifactRef {
    /// Validate and wrap an artifact name.
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidArtifactRef> {
        let name = name.into();
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0']);
        if valid {
            Ok(Self(name))
        } else {
            Err(InvalidArtifactRef(name))
        }
    }

    /// Mint a fresh reference for a newly sealed document.
    pub fn generate() -> Self {
        Self(format!("{}.enc", Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for ArtifactRef {
    type Error = InvalidArtifactRef;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

impl From<ArtifactRef> for String {
    fn from(r: ArtifactRef) -> Self {
        r.0
    }
}

/// Rejected artifact reference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid artifact reference: {0:?}")]
pub struct InvalidArtifactRef(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_parse_roundtrip() {
        let id = DocumentId::generate();
        let parsed = DocumentId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_document_ids_are_unique() {
        assert_ne!(DocumentId::generate(), DocumentId::generate());
    }

    #[test]
    fn test_artifact_ref_rejects_paths() {
        assert!(ArtifactRef::new("../secret").is_err());
        assert!(ArtifactRef::new("a/b.enc").is_err());
        assert!(ArtifactRef::new("a\\b.enc").is_err());
        assert!(ArtifactRef::new("..").is_err());
        assert!(ArtifactRef::new("").is_err());
        assert!(ArtifactRef::new("1700000000_paper.pdf.enc").is_ok());
    }

    #[test]
    fn test_artifact_ref_serde_validates() {
        let ok: ArtifactRef = serde_json::from_str("\"x.enc\"").unwrap();
        assert_eq!(ok.as_str(), "x.enc");
        assert!(serde_json::from_str::<ArtifactRef>("\"../x\"").is_err());
    }

    #[test]
    fn test_generated_artifact_refs_are_valid() {
        let r = ArtifactRef::generate();
        assert!(ArtifactRef::new(r.as_str()).is_ok());
        assert!(r.as_str().ends_with(".enc"));
    }
}
