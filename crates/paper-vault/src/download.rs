//! The watermarked output of a successful download.

use std::fs::File;
use std::io::{self, Read};

use paper_vault_core::DocumentId;
use uuid::Uuid;

use crate::ephemeral::EphemeralArtifact;

/// A readable watermarked document.
///
/// Backed by an ephemeral file that is removed when the `Download` is
/// dropped. Stream it to the requester, then drop it.
#[derive(Debug)]
pub struct Download {
    document_id: DocumentId,
    version: u32,
    request_id: Uuid,
    page_count: usize,
    len: u64,
    // Declared before `artifact` so the handle closes before removal.
    file: File,
    artifact: EphemeralArtifact,
}

impl Download {
    pub(crate) fn new(
        document_id: DocumentId,
        version: u32,
        request_id: Uuid,
        page_count: usize,
        artifact: EphemeralArtifact,
    ) -> io::Result<Self> {
        let file = artifact.reopen()?;
        let len = file.metadata()?.len();
        Ok(Self {
            document_id,
            version,
            request_id,
            page_count,
            len,
            file,
            artifact,
        })
    }

    pub fn document_id(&self) -> DocumentId {
        self.document_id
    }

    /// Content version that was decrypted.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Id shared by every ephemeral file of this request.
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Size of the watermarked document in bytes.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Path of the backing ephemeral file.
    pub fn path(&self) -> Option<&std::path::Path> {
        self.artifact.path()
    }

    /// Read the whole document into memory, removing the backing file.
    pub fn into_bytes(mut self) -> io::Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(self.len as usize);
        self.file.read_to_end(&mut buf)?;
        Ok(buf)
    }
}

impl Read for Download {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}
