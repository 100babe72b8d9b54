//! Filesystem storage for ciphertext artifacts.
//!
//! Ciphertext is durable: a new artifact is written to a staging file in the
//! artifact directory, synced, and then linked into place under its final
//! name without overwriting anything. Until [`StagedArtifact::commit`]
//! succeeds the artifact is not observable under its reference, and a
//! dropped staging file is removed.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use paper_vault_core::ArtifactRef;
use tempfile::NamedTempFile;

use crate::error::{Result, StoreError};

const STAGING_PREFIX: &str = ".staging-";

/// Directory of ciphertext artifacts addressed by [`ArtifactRef`].
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (creating if needed) an artifact directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of an artifact.
    pub fn path_of(&self, artifact: &ArtifactRef) -> PathBuf {
        self.root.join(artifact.as_str())
    }

    pub fn exists(&self, artifact: &ArtifactRef) -> bool {
        self.path_of(artifact).is_file()
    }

    /// Begin writing a new artifact.
    pub fn stage(&self) -> Result<StagedArtifact> {
        let file = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .tempfile_in(&self.root)?;
        Ok(StagedArtifact {
            file,
            root: self.root.clone(),
        })
    }

    /// Open a committed artifact for reading.
    pub fn open_artifact(&self, artifact: &ArtifactRef) -> Result<File> {
        File::open(self.path_of(artifact)).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => StoreError::ArtifactNotFound(artifact.clone()),
            _ => StoreError::Io(e),
        })
    }

    /// Erase an artifact. Returns `false` if it did not exist.
    pub fn remove(&self, artifact: &ArtifactRef) -> Result<bool> {
        match fs::remove_file(self.path_of(artifact)) {
            Ok(()) => {
                tracing::debug!(artifact = %artifact, "artifact removed");
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    /// Remove staging files left behind by a crashed process.
    pub fn sweep_staging(&self) -> Result<usize> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let is_staging = entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with(STAGING_PREFIX));
            if is_staging && entry.file_type()?.is_file() {
                match fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(e) => tracing::warn!(path = %entry.path().display(), error = %e, "failed to sweep staging file"),
                }
            }
        }
        Ok(removed)
    }
}

/// An artifact being written. Dropping it discards the partial write.
pub struct StagedArtifact {
    file: NamedTempFile,
    root: PathBuf,
}

impl StagedArtifact {
    /// The writable staging file.
    pub fn file_mut(&mut self) -> &mut File {
        self.file.as_file_mut()
    }

    /// Make the artifact visible under `artifact`.
    ///
    /// Fails with `ArtifactExists` rather than overwrite another artifact.
    pub fn commit(self, artifact: &ArtifactRef) -> Result<()> {
        self.file.as_file().sync_all()?;
        let dest = self.root.join(artifact.as_str());
        self.file.persist_noclobber(&dest).map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                StoreError::ArtifactExists(artifact.clone())
            } else {
                StoreError::Io(e.error)
            }
        })?;
        Ok(())
    }
}
