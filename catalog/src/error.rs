//! Error types for template catalog operations.
//!
//! Covers every way loading a template store can fail: I/O, serialization,
//! and structural problems in the dictionary itself.

use thiserror::Error;

/// Errors that can occur while loading or building a catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A template has an empty canonical key.
    #[error("template #{0} has an empty canonical key")]
    EmptyCanonicalKey(usize),

    /// Two templates share a canonical key.
    #[error("duplicate canonical key: {0}")]
    DuplicateCanonicalKey(String),

    /// The store file extension is not `.json`, `.yaml` or `.yml`.
    #[error("unsupported template store format: {0}")]
    UnsupportedFormat(String),
}

/// Convenience alias for results with [`CatalogError`].
pub type Result<T> = std::result::Result<T, CatalogError>;
