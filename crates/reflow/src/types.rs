use serde::{Deserialize, Serialize};

/// Reconstructed text of one page.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// 1-based page number.
    pub page: usize,
    pub text: String,
}

/// Document-level facts read from the PDF trailer.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub page_count: usize,
}
