//! Fragment acquisition from PDF bytes.

pub mod backend;
pub mod fragments;

pub use backend::{LopdfBackend, PdfBackend};
pub use fragments::{extract_page_fragments, PdfFragmentSource};
