//! # Paper Vault Render
//!
//! Visible watermarking of PDF documents.
//!
//! [`WatermarkRenderer`] draws a marker string over every page of a PDF
//! without touching page count, order, or dimensions. The default
//! [`WatermarkStyle`] is Helvetica at 50pt, 30% opacity, rotated -45°,
//! centered on each page.
//!
//! ```rust,no_run
//! use paper_vault_render::WatermarkRenderer;
//!
//! let input = std::fs::File::open("paper.pdf").unwrap();
//! let output = std::fs::File::create("paper.marked.pdf").unwrap();
//! let report = WatermarkRenderer::default()
//!     .render(input, output, "Confidential")
//!     .unwrap();
//! println!("marked {} pages", report.page_count);
//! ```
//!
//! [`inspect`] reads a rendered file back and reports, per page, whether
//! the marker is present and with what opacity and rotation.

pub mod error;
pub mod inspect;
pub mod metrics;
mod pdf;
pub mod watermark;

pub use error::{RenderError, Result};
pub use inspect::{inspect, PageReport};
pub use metrics::{measure, TextExtent};
pub use watermark::{RenderReport, WatermarkRenderer, WatermarkStyle};
