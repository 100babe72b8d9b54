//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use tempfile::TempDir;

use paper_vault::{Vault, VaultConfig};
use paper_vault_core::{ActorId, NewDocument};
use paper_vault_store::{AuditLog, DocumentStore, MemoryStore, SqliteStore};

/// A4 in points.
pub const A4: (f32, f32) = (595.0, 842.0);

/// US Letter in points.
pub const LETTER: (f32, f32) = (612.0, 792.0);

/// Build a PDF with `pages` A4 pages.
///
/// Page size and fonts are inherited from the page tree, the way most
/// producers write them.
pub fn sample_pdf(pages: usize) -> Vec<u8> {
    build_pdf(&vec![None; pages], Some(A4))
}

/// Build a PDF whose pages carry their own, possibly different, sizes.
pub fn sample_pdf_with_sizes(sizes: &[(f32, f32)]) -> Vec<u8> {
    let sizes: Vec<_> = sizes.iter().copied().map(Some).collect();
    build_pdf(&sizes, None)
}

fn build_pdf(page_sizes: &[Option<(f32, f32)>], tree_size: Option<(f32, f32)>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Times-Roman",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids: Vec<Object> = Vec::new();
    for (n, size) in page_sizes.iter().enumerate() {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 14.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new(
                    "Tj",
                    vec![Object::string_literal(format!("Question {}", n + 1))],
                ),
                Operation::new("ET", vec![]),
            ],
        };
        let bytes = content.encode().unwrap_or_default();
        let content_id = doc.add_object(Stream::new(dictionary! {}, bytes));

        let mut page = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        };
        if let Some((w, h)) = size {
            page.set("MediaBox", media_box(*w, *h));
        }
        kids.push(doc.add_object(page).into());
    }

    let mut pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_sizes.len() as i64,
        "Resources" => resources_id,
    };
    if let Some((w, h)) = tree_size {
        pages.set("MediaBox", media_box(w, h));
    }
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)
        .map(|_| out)
        .unwrap_or_default()
}

fn media_box(w: f32, h: f32) -> Object {
    Object::Array(vec![0.into(), 0.into(), w.into(), h.into()])
}

/// The instant scenarios treat as "T", the start of the exam window.
pub fn exam_start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 9, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Metadata for a new paper uploaded by a fixed examiner.
pub fn paper(title: &str) -> NewDocument {
    NewDocument::new(title, examiner()).with_description("Sample paper for tests")
}

pub fn examiner() -> ActorId {
    ActorId::from("examiner-01")
}

pub fn candidate_centre() -> ActorId {
    ActorId::from("centre-042")
}

/// A vault over temporary directories that are removed with the fixture.
pub struct TestVault<S: DocumentStore + AuditLog = MemoryStore> {
    pub vault: Vault<S>,
    dir: TempDir,
}

impl TestVault<MemoryStore> {
    /// A vault over an in-memory store.
    pub fn memory() -> Self {
        Self::build(MemoryStore::new(), |_| {})
    }

    /// A vault over an in-memory store with adjusted configuration.
    pub fn memory_with(configure: impl FnOnce(&mut VaultConfig)) -> Self {
        Self::build(MemoryStore::new(), configure)
    }
}

impl TestVault<SqliteStore> {
    /// A vault over a SQLite database inside the fixture directory.
    pub fn sqlite() -> Self {
        let dir = tempdir();
        let store = SqliteStore::open(dir.path().join("vault.db")).unwrap_or_else(|e| {
            panic!("failed to open test database: {e}");
        });
        Self::with_dir(dir, store, |_| {})
    }
}

impl<S: DocumentStore + AuditLog + 'static> TestVault<S> {
    fn build(store: S, configure: impl FnOnce(&mut VaultConfig)) -> Self {
        Self::with_dir(tempdir(), store, configure)
    }

    fn with_dir(dir: TempDir, store: S, configure: impl FnOnce(&mut VaultConfig)) -> Self {
        let mut config = VaultConfig::rooted_at(dir.path());
        configure(&mut config);
        let vault = Vault::open(store, config).unwrap_or_else(|e| {
            panic!("failed to open test vault: {e}");
        });
        Self { vault, dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Files currently in the scratch directory.
    pub fn scratch_files(&self) -> Vec<PathBuf> {
        list_files(&self.vault.config().scratch_dir)
    }

    /// Files currently in the artifact directory.
    pub fn artifact_files(&self) -> Vec<PathBuf> {
        list_files(&self.vault.config().artifact_dir)
    }
}

impl<S: DocumentStore + AuditLog> std::ops::Deref for TestVault<S> {
    type Target = Vault<S>;

    fn deref(&self) -> &Vault<S> {
        &self.vault
    }
}

fn tempdir() -> TempDir {
    tempfile::tempdir().unwrap_or_else(|e| panic!("failed to create temp dir: {e}"))
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok().map(|e| e.path())).collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_pdf_page_count() {
        let doc = Document::load_mem(&sample_pdf(4)).unwrap();
        assert_eq!(doc.get_pages().len(), 4);
    }

    #[test]
    fn test_mixed_sizes() {
        let bytes = sample_pdf_with_sizes(&[A4, LETTER]);
        let pages = paper_vault_render::inspect(&bytes, "unused").unwrap();
        assert_eq!((pages[0].width, pages[0].height), A4);
        assert_eq!((pages[1].width, pages[1].height), LETTER);
        assert!(pages.iter().all(|p| !p.marker_found));
    }

    #[tokio::test]
    async fn test_vault_fixture_starts_empty() {
        let fixture = TestVault::memory();
        assert!(fixture.list_documents().await.unwrap().is_empty());
        assert!(fixture.scratch_files().is_empty());
        assert!(fixture.artifact_files().is_empty());
    }
}
