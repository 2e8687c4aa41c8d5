use thiserror::Error;

use crate::diagnostic::ValidationReport;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The document parsed as JSON but its operators did not decode.
    #[error("Plan document rejected:\n{0}")]
    Decode(ValidationReport),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Hashing error: {0}")]
    Hash(String),

    // Core only touches the filesystem when loading catalogs and configs.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
