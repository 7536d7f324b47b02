//! Reconstruct readable text from positioned PDF text fragments.
//!
//! PDF content streams only record glyph runs and where they are drawn. This
//! crate rebuilds line breaks and paragraph boundaries from that geometry:
//!
//! ```text
//! TextFragment[]  ->  PositionedFragment[]  ->  Line[]  ->  page text  ->  document
//!   (per page)          fragment::normalize     cluster     assemble      driver
//! ```
//!
//! Everything after acquisition is pure and works on borrowed data, so pages
//! are reconstructed in parallel and reassembled in order. Acquisition from
//! PDF bytes lives in [`parser`] behind the [`FragmentSource`] trait.

use thiserror::Error;

pub mod assemble;
pub mod cluster;
pub mod config;
pub mod driver;
pub mod fragment;
pub mod parser;
pub mod types;

pub use config::{PageFailurePolicy, ReflowConfig};
pub use driver::{
    acquire_pages, read_document, read_pages, reconstruct_document, reconstruct_page,
    reconstruct_pages, FragmentSource,
};
pub use fragment::TextFragment;
pub use types::*;

use parser::{LopdfBackend, PdfFragmentSource};

#[derive(Debug, Error)]
pub enum ReflowError {
    #[error("Document unreadable: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("Page {page} unreadable: {reason}")]
    PageUnreadable { page: usize, reason: String },
    #[error("Invalid configuration: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Convenience free functions (parse the bytes on every call)
// ---------------------------------------------------------------------------

/// Open PDF bytes as a [`FragmentSource`].
pub fn open(bytes: &[u8]) -> Result<PdfFragmentSource<LopdfBackend>, ReflowError> {
    Ok(PdfFragmentSource::new(LopdfBackend::load_bytes(bytes)?))
}

/// Reconstructed text of a whole PDF.
pub fn extract_text(bytes: &[u8], config: &ReflowConfig) -> Result<String, ReflowError> {
    read_document(&open(bytes)?, config)
}

/// Reconstructed text of every page of a PDF, one record per page.
pub fn extract_pages(bytes: &[u8], config: &ReflowConfig) -> Result<Vec<PageText>, ReflowError> {
    read_pages(&open(bytes)?, config)
}

/// Raw fragments of every page, before any reconstruction. Unreadable pages
/// follow `config.page_failure`.
pub fn extract_fragments(
    bytes: &[u8],
    config: &ReflowConfig,
) -> Result<Vec<Vec<TextFragment>>, ReflowError> {
    acquire_pages(&open(bytes)?, config)
}

/// Document info without touching any content stream.
pub fn info(bytes: &[u8]) -> Result<DocumentInfo, ReflowError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    let mut raw = backend.metadata();

    Ok(DocumentInfo {
        title: raw.remove("Title"),
        author: raw.remove("Author"),
        creator: raw.remove("Creator"),
        producer: raw.remove("Producer"),
        page_count: backend.page_count(),
    })
}
