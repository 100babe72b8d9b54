//! Request-scoped ephemeral artifacts.
//!
//! Every download gets its own [`EphemeralScope`] carrying a fresh request
//! id. Files created through the scope are named
//! `{request_id}-{stage}-{random}`, so two requests for the same document
//! never share a path and one request's cleanup cannot touch another's
//! files.
//!
//! An [`EphemeralArtifact`] removes its file when dropped, whether the
//! request finished, failed, or was abandoned. Removal failures are logged
//! and never returned in place of the request's own result.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempPath;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::LifecycleError;

/// Names and creates the ephemeral files of one request.
#[derive(Debug, Clone)]
pub struct EphemeralScope {
    request_id: Uuid,
    dir: PathBuf,
}

impl EphemeralScope {
    /// A scope with a fresh request id.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            dir: dir.into(),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create an empty artifact for `stage` (e.g. `"plain"`, `"marked"`).
    pub fn create(&self, stage: &'static str) -> Result<EphemeralArtifact, LifecycleError> {
        let prefix = format!("{}-{}-", self.request_id, stage);
        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .tempfile_in(&self.dir)
            .map_err(|source| LifecycleError::Create {
                stage,
                dir: self.dir.clone(),
                source,
            })?;
        let (file, path) = file.into_parts();
        debug!(request_id = %self.request_id, stage, path = %path.display(), "ephemeral artifact created");
        Ok(EphemeralArtifact {
            file: Some(file),
            path: Some(path),
            stage,
        })
    }
}

/// A temporary file that is removed when dropped.
#[derive(Debug)]
pub struct EphemeralArtifact {
    file: Option<File>,
    path: Option<TempPath>,
    stage: &'static str,
}

impl EphemeralArtifact {
    pub fn stage(&self) -> &'static str {
        self.stage
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The write handle the artifact was created with.
    pub fn file_mut(&mut self) -> io::Result<&mut File> {
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("ephemeral artifact closed"))
    }

    /// Open a fresh read handle positioned at the start.
    pub fn reopen(&self) -> io::Result<File> {
        match &self.path {
            Some(path) => File::open(path),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                "ephemeral artifact already removed",
            )),
        }
    }

    /// Remove the file now.
    ///
    /// Dropping the artifact does the same but can only log a failure.
    pub fn remove(mut self) -> Result<(), LifecycleError> {
        self.remove_inner()
    }

    fn remove_inner(&mut self) -> Result<(), LifecycleError> {
        drop(self.file.take());
        let Some(path) = self.path.take() else {
            return Ok(());
        };
        let removed = path.to_path_buf();
        path.close().map_err(|source| LifecycleError::Remove {
            path: removed.clone(),
            source,
        })?;
        debug!(stage = self.stage, path = %removed.display(), "ephemeral artifact removed");
        Ok(())
    }
}

impl Drop for EphemeralArtifact {
    fn drop(&mut self) {
        if let Err(e) = self.remove_inner() {
            warn!(stage = self.stage, error = %e, "ephemeral cleanup failed");
        }
    }
}

/// Whether `name` looks like a file created by [`EphemeralScope::create`].
fn is_ephemeral_name(name: &str) -> bool {
    name.get(..36)
        .is_some_and(|id| Uuid::parse_str(id).is_ok())
        && name.as_bytes().get(36) == Some(&b'-')
}

/// Remove ephemeral files left in `dir` by a process that did not exit
/// cleanly. Returns how many were removed.
pub fn sweep_stale(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let is_stale = entry
            .file_name()
            .to_str()
            .is_some_and(is_ephemeral_name);
        if is_stale && entry.file_type()?.is_file() {
            match fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "failed to sweep stale ephemeral file")
                }
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect()
    }

    #[test]
    fn test_names_are_request_scoped() {
        let dir = tempfile::tempdir().unwrap();
        let a = EphemeralScope::new(dir.path());
        let b = EphemeralScope::new(dir.path());
        assert_ne!(a.request_id(), b.request_id());

        let first = a.create("plain").unwrap();
        let second = a.create("plain").unwrap();
        let other = b.create("plain").unwrap();

        let name = |art: &EphemeralArtifact| {
            art.path().unwrap().file_name().unwrap().to_str().unwrap().to_string()
        };
        assert!(name(&first).starts_with(&format!("{}-plain-", a.request_id())));
        assert!(name(&other).starts_with(&format!("{}-plain-", b.request_id())));
        assert_ne!(name(&first), name(&second));
    }

    #[test]
    fn test_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let scope = EphemeralScope::new(dir.path());
        {
            let mut artifact = scope.create("marked").unwrap();
            artifact.file_mut().unwrap().write_all(b"%PDF-1.5").unwrap();
            let mut contents = Vec::new();
            artifact.reopen().unwrap().read_to_end(&mut contents).unwrap();
            assert_eq!(contents, b"%PDF-1.5");
            assert_eq!(files_in(dir.path()).len(), 1);
        }
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn test_remove_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = EphemeralScope::new(dir.path()).create("plain").unwrap();
        fs::remove_file(artifact.path().unwrap()).unwrap();

        let err = artifact.remove().unwrap_err();
        assert!(matches!(err, LifecycleError::Remove { .. }));
    }

    #[test]
    fn test_drop_after_external_removal_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = EphemeralScope::new(dir.path()).create("plain").unwrap();
        fs::remove_file(artifact.path().unwrap()).unwrap();
        drop(artifact);
    }

    #[test]
    fn test_create_in_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let scope = EphemeralScope::new(dir.path().join("missing"));
        assert!(matches!(
            scope.create("plain"),
            Err(LifecycleError::Create { stage: "plain", .. })
        ));
    }

    #[test]
    fn test_sweep_only_touches_ephemeral_names() {
        let dir = tempfile::tempdir().unwrap();
        let scope = EphemeralScope::new(dir.path());
        let leaked = scope.create("plain").unwrap();
        // Simulate a crash: the file stays, the guard is forgotten.
        let path = leaked.path().unwrap().to_path_buf();
        std::mem::forget(leaked);
        fs::write(dir.path().join("notes.txt"), b"keep").unwrap();

        assert_eq!(sweep_stale(dir.path()).unwrap(), 1);
        assert!(!path.exists());
        assert!(dir.path().join("notes.txt").exists());
    }
}
