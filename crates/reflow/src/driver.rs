//! Per-page orchestration and document assembly.
//!
//! Page reconstruction is pure, so pages fan out across the rayon pool and
//! are collected back in their original order. Fragment acquisition goes
//! through [`FragmentSource`] and runs sequentially before that.

use log::{debug, warn};
use rayon::prelude::*;

use crate::assemble::{assemble_page, PARAGRAPH_BREAK};
use crate::cluster::cluster_lines;
use crate::config::{PageFailurePolicy, ReflowConfig};
use crate::fragment::{normalize, TextFragment};
use crate::types::PageText;
use crate::ReflowError;

/// Anything that can hand out the fragments of a document page by page.
pub trait FragmentSource {
    /// Number of pages in the document.
    fn page_count(&self) -> usize;

    /// Fragments of the page at `index` (0-based), in no particular order.
    fn page_fragments(&self, index: usize) -> Result<Vec<TextFragment>, ReflowError>;
}

impl FragmentSource for Vec<Vec<TextFragment>> {
    fn page_count(&self) -> usize {
        self.len()
    }

    fn page_fragments(&self, index: usize) -> Result<Vec<TextFragment>, ReflowError> {
        self.get(index)
            .cloned()
            .ok_or_else(|| ReflowError::PageUnreadable {
                page: index + 1,
                reason: "page index out of range".to_string(),
            })
    }
}

/// Normalise, cluster, and assemble a single page.
pub fn reconstruct_page(fragments: &[TextFragment], config: &ReflowConfig) -> String {
    let positioned = normalize(fragments, config);
    if positioned.is_empty() {
        return String::new();
    }
    let lines = cluster_lines(positioned, config);
    assemble_page(&lines, config)
}

/// Reconstruct every page in parallel, returning texts in input order.
pub fn reconstruct_pages(pages: &[Vec<TextFragment>], config: &ReflowConfig) -> Vec<String> {
    pages
        .par_iter()
        .enumerate()
        .map(|(i, fragments)| {
            let text = reconstruct_page(fragments, config);
            debug!(
                "page {}: {} fragments -> {} bytes of text",
                i + 1,
                fragments.len(),
                text.len()
            );
            text
        })
        .collect()
}

/// Join page texts with a blank line, skipping empty pages, and trim.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut document = String::new();

    for page in pages {
        let page = page.as_ref();
        if page.is_empty() {
            continue;
        }
        if !document.is_empty() {
            document.push_str(PARAGRAPH_BREAK);
        }
        document.push_str(page);
    }

    document.trim().to_string()
}

/// Reconstruct a whole document from in-memory pages.
pub fn reconstruct_document(pages: &[Vec<TextFragment>], config: &ReflowConfig) -> String {
    join_pages(reconstruct_pages(pages, config))
}

/// Pull every page out of `source`, applying the configured failure policy.
pub fn acquire_pages(
    source: &dyn FragmentSource,
    config: &ReflowConfig,
) -> Result<Vec<Vec<TextFragment>>, ReflowError> {
    let count = source.page_count();
    let mut pages = Vec::with_capacity(count);

    for index in 0..count {
        match source.page_fragments(index) {
            Ok(fragments) => pages.push(fragments),
            Err(err) => match config.page_failure {
                PageFailurePolicy::Abort => {
                    return Err(ReflowError::PageUnreadable {
                        page: index + 1,
                        reason: err.to_string(),
                    });
                }
                PageFailurePolicy::Substitute => {
                    warn!("page {} unreadable, substituting empty text: {}", index + 1, err);
                    pages.push(Vec::new());
                }
            },
        }
    }

    Ok(pages)
}

/// Reconstruct every page of `source` and keep them separate.
pub fn read_pages(
    source: &dyn FragmentSource,
    config: &ReflowConfig,
) -> Result<Vec<PageText>, ReflowError> {
    let pages = acquire_pages(source, config)?;
    let texts = reconstruct_pages(&pages, config);

    Ok(texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| PageText { page: i + 1, text })
        .collect())
}

/// Reconstruct the full text of `source`.
pub fn read_document(
    source: &dyn FragmentSource,
    config: &ReflowConfig,
) -> Result<String, ReflowError> {
    let pages = acquire_pages(source, config)?;
    Ok(reconstruct_document(&pages, config))
}
