/// Error types shared across the regrag crates.
///
/// These cover the infrastructure pieces that live in this crate (reference catalog loading).
/// Server-specific errors are defined in the server crate and wrap `CommonError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CommonError {
    #[error("catalog io error: {0}")]
    CatalogIo(#[from] std::io::Error),

    #[error("catalog json error: {0}")]
    CatalogJson(#[from] serde_json::Error),

    #[error("catalog document pattern error: {0}")]
    DocumentPattern(#[from] regex::Error),

    #[error("invalid catalog: {0}")]
    InvalidCatalog(String),
}
