#[derive(thiserror::Error, Debug, serde::Deserialize, serde::Serialize)]
pub enum Error {
    #[error("Cannot read config file {path}: {reason}")]
    ConfigRead { path: String, reason: String },

    #[error("Invalid config file {path}: {reason}")]
    ConfigInvalid { path: String, reason: String },

    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: usize, count: usize },
}
