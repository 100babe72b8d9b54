//! # Paper Vault Testkit
//!
//! Testing utilities for Paper Vault.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: sample multi-page PDFs and a ready-to-use vault over
//!   temporary directories
//! - **Generators**: Proptest strategies for windows, instants, key material
//!   and plaintext
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use paper_vault_testkit::fixtures::{paper, sample_pdf, TestVault};
//!
//! async fn example() {
//!     let fixture = TestVault::memory();
//!     let summary = fixture.upload(paper("Biology Paper I"), sample_pdf(10)).await.unwrap();
//!     assert_eq!(summary.version, 1);
//!     assert!(fixture.scratch_files().is_empty());
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use paper_vault_testkit::generators::window_and_now;
//!
//! proptest! {
//!     #[test]
//!     fn open_means_inside(pair in window_and_now()) {
//!         let (window, now) = pair;
//!         prop_assert_eq!(window.contains(now), window.start() <= now && now <= window.end());
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{
    candidate_centre, exam_start, examiner, paper, sample_pdf, sample_pdf_with_sizes, TestVault,
    A4, LETTER,
};
