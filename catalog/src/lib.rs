//! Canonical template dictionary loading and fuzzy matching.
//!
//! This crate owns the read-only side of field normalization: loading a
//! template store (JSON, YAML, or the embedded dental dictionary), indexing
//! it for exact and fuzzy lookup, vetoing known false positives with
//! negative rules, and merging a matched template into a detected field.
//!
//! # Quick start
//!
//! ```
//! use form_schema_catalog::{MatchConfig, TemplateCatalog, TemplateMatcher, apply_template};
//! use form_schema_core::{Field, FieldType};
//!
//! let catalog = TemplateCatalog::builtin().unwrap();
//! let config = MatchConfig::default();
//! let matcher = TemplateMatcher::new(&catalog, &config);
//!
//! let mut field = Field::new("birthdate", "Birthdate", FieldType::Input);
//! let outcome = matcher.match_field(&field);
//! if let Some(template) = outcome.template {
//!     apply_template(&mut field, template);
//! }
//! assert_eq!(field.key, "date_of_birth");
//! assert_eq!(field.field_type, FieldType::Date);
//! ```

mod config;
mod error;
mod loader;
mod matcher;
mod merge;

pub use config::{DEFAULT_MATCH_THRESHOLD, MatchConfig, NegativeRule, default_negative_rules};
pub use error::{CatalogError, Result};
pub use loader::{CatalogSource, TemplateCatalog};
pub use matcher::{MatchEvent, MatchKind, MatchOutcome, TemplateMatcher, label_similarity};
pub use merge::apply_template;
