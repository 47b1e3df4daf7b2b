//! Error types for extractor construction and adapters.
//!
//! The per-document pass itself never fails; these errors come from loading
//! configuration, compiling pattern tables, reading input files and
//! building the batch thread pool.

use thiserror::Error;

use form_schema_catalog::CatalogError;

/// Errors raised while configuring or driving the extractor.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML (or JSON) configuration parsing failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A configuration value is out of its accepted range.
    #[error("invalid config value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// A configured regular expression failed to compile.
    #[error("invalid pattern in {table}: {pattern:?}: {source}")]
    InvalidPattern {
        table: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Batch input paths were missing or unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Template catalog failure.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The batch worker pool could not be created.
    #[error("thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Convenience alias for results with [`ExtractError`].
pub type Result<T> = std::result::Result<T, ExtractError>;
