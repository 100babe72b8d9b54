//! Error types for the render module.

use thiserror::Error;

/// Errors that can occur while watermarking a document.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The input is not a well-formed PDF.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// A specific page could not be watermarked.
    #[error("page {page} of {page_count}: {reason}")]
    Page {
        page: u32,
        page_count: usize,
        reason: String,
    },

    /// Encoding the output failed.
    #[error("failed to write document: {0}")]
    Write(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for render operations.
pub type Result<T> = std::result::Result<T, RenderError>;
