use serde::{Deserialize, Serialize};

use crate::Field;

/// Serializable envelope around one document's extracted fields.
///
/// Carries enough metadata to trace a field list back to its source
/// document and to the template dictionary that normalized it.
///
/// # Examples
///
/// ```
/// use form_schema_core::*;
///
/// let mut document = FormDocument::new("intake.txt", "2024-01-15T10:30:00Z");
/// document.fields.push(Field::new("first_name", "First Name", FieldType::Input));
///
/// assert_eq!(document.field_count(), 1);
/// assert_eq!(document.schema_version, SCHEMA_CONTRACT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormDocument {
    /// Field contract version (populated from
    /// [`SCHEMA_CONTRACT_VERSION`](crate::SCHEMA_CONTRACT_VERSION)).
    pub schema_version: String,
    /// Name of the source document (usually its file name).
    pub source: String,
    /// RFC-3339 timestamp of extraction.
    pub generated_at: String,
    /// SHA-256 digest of the template catalog used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_digest: Option<String>,
    /// Extracted fields in document order.
    pub fields: Vec<Field>,
}

impl FormDocument {
    /// Creates an empty document envelope.
    pub fn new(source: impl Into<String>, generated_at: impl Into<String>) -> Self {
        Self {
            schema_version: crate::SCHEMA_CONTRACT_VERSION.to_string(),
            source: source.into(),
            generated_at: generated_at.into(),
            catalog_digest: None,
            fields: Vec::new(),
        }
    }

    /// Attaches a catalog digest.
    pub fn with_catalog_digest(mut self, digest: impl Into<String>) -> Self {
        self.catalog_digest = Some(digest.into());
        self
    }

    /// Returns the number of fields.
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Looks up a field by key.
    pub fn find_field(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }
}
