//! Field list and document validation.
//!
//! Checks the structural invariants of an emitted field list: unique slug
//! keys, non-empty option lists on choice fields, confidence in range, and
//! conditional references that point at an earlier field.
//!
//! # Examples
//!
//! ```
//! use form_schema_core::*;
//!
//! let fields = vec![
//!     Field::new("smoker", "Do you smoke?", FieldType::Radio)
//!         .with_control(Control::choice(&["Yes", "No"], false)),
//!     Field::new("smoker_explanation", "If yes, please explain", FieldType::Input)
//!         .conditional_on("smoker", "yes"),
//! ];
//! assert!(validate_fields(&fields).is_empty());
//!
//! // Invalid: a radio with no options
//! let bad = vec![Field::new("gender", "Gender", FieldType::Radio)];
//! assert!(!validate_fields(&bad).is_empty());
//! ```

use std::collections::HashSet;

use thiserror::Error;

use crate::{Field, FormDocument, slugify};

/// Field/document validation errors.
///
/// Each variant describes a specific structural problem. Unlike the
/// schema validator this collects every problem instead of stopping at the
/// first one.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Document schema version is empty.
    #[error("document schema version cannot be empty")]
    EmptySchemaVersion,
    /// Field key is empty or whitespace-only.
    #[error("field key cannot be empty (title: {0:?})")]
    EmptyKey(String),
    /// Field key is not already a slug.
    #[error("invalid key format: {0}")]
    InvalidKey(String),
    /// Two fields share a key.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),
    /// A radio/dropdown/checkbox field has no options.
    #[error("choice field has no options: {0}")]
    EmptyOptions(String),
    /// A conditional reference points at a missing or later field.
    #[error("field {key} is conditional on unknown or later field {target}")]
    DanglingConditional { key: String, target: String },
    /// Confidence outside [0, 1].
    #[error("confidence out of range for {key}: {value}")]
    ConfidenceOutOfRange { key: String, value: f64 },
}

/// Validates a document envelope.
///
/// Checks the schema version and validates the field list.
pub fn validate_document(document: &FormDocument) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    if document.schema_version.trim().is_empty() {
        errors.push(ValidationError::EmptySchemaVersion);
    }
    errors.extend(validate_fields(&document.fields));
    errors
}

/// Validates an ordered field list.
///
/// # Examples
///
/// ```
/// use form_schema_core::*;
///
/// let fields = vec![
///     Field::new("email", "Email", FieldType::Input),
///     Field::new("email", "E-mail", FieldType::Input),
/// ];
/// let errors = validate_fields(&fields);
/// assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateKey(_))));
/// ```
pub fn validate_fields(fields: &[Field]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();

    for field in fields {
        let key = field.key.as_str();

        if key.trim().is_empty() {
            errors.push(ValidationError::EmptyKey(field.title.clone()));
        } else if slugify(key) != key {
            errors.push(ValidationError::InvalidKey(key.to_string()));
        }

        if field.field_type.is_choice() && !field.has_options() {
            errors.push(ValidationError::EmptyOptions(key.to_string()));
        }

        if !(0.0..=1.0).contains(&field.confidence) {
            errors.push(ValidationError::ConfidenceOutOfRange {
                key: key.to_string(),
                value: field.confidence,
            });
        }

        if let Some(cond) = &field.conditional_on
            && !seen.contains(cond.key.as_str())
        {
            errors.push(ValidationError::DanglingConditional {
                key: key.to_string(),
                target: cond.key.clone(),
            });
        }

        if !seen.insert(key) {
            errors.push(ValidationError::DuplicateKey(key.to_string()));
        }
    }

    errors
}
