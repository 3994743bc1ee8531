use thiserror::Error;

/// Failures talking to the catalog service.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Catalog returned {status} for {path}: {body}")]
    Status {
        status: u16,
        path: String,
        body: String,
    },

    #[error("Malformed catalog record: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog not configured: {0}")]
    NotConfigured(String),
}

impl From<serde_json::Error> for CatalogError {
    fn from(err: serde_json::Error) -> Self {
        CatalogError::Malformed(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CullError {
    /// A catalog read failed; nothing was mutated.
    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(#[source] CatalogError),

    /// The duplicate listing could not be fetched, so no index exists.
    #[error("Duplicate index unavailable: {0}")]
    IndexUnavailable(#[source] CatalogError),

    #[error("Unknown library: {0}")]
    UnknownLibrary(String),
}
