//! Core field types and shared document primitives.
//!
//! This crate defines the data model for structured form extraction:
//!
//! - [`Field`]: one typed form-input descriptor (key, title, section,
//!   type, control payload, confidence, optional conditional link).
//! - [`Section`], [`FieldType`], [`InputKind`]: the fixed enumerations a
//!   field is classified into.
//! - [`Control`] / [`FieldOption`]: type-specific payload for choices,
//!   inputs and terms blocks.
//! - [`Template`]: a canonical dictionary entry used to normalize fields.
//! - [`FormDocument`]: a versioned envelope around one document's fields.
//!
//! Key helpers ([`slugify`], [`derive_key`], [`normalize_label`]) produce
//! stable identifiers and comparison strings. Validation
//! ([`validate_fields`], [`validate_document`]) catches duplicate keys,
//! option-less choice fields and dangling conditional references.
//!
//! # Example
//!
//! ```
//! use form_schema_core::*;
//!
//! let physician = Field::new(
//!     &derive_key("Are you under a physician's care now?"),
//!     "Are you under a physician's care now?",
//!     FieldType::Radio,
//! )
//! .with_section(Section::MedicalHistory)
//! .with_control(Control::choice(&["Yes", "No"], false));
//!
//! let explain = Field::new("physician_care_now_explanation", "If yes, please explain", FieldType::Input)
//!     .with_section(Section::MedicalHistory)
//!     .conditional_on(&physician.key, "yes");
//!
//! assert_eq!(physician.key, "physician_care_now");
//! assert!(validate_fields(&[physician, explain]).is_empty());
//! ```

mod document;
mod slug;
mod types;
mod validate;

pub use document::FormDocument;
pub use slug::{FALLBACK_KEY, MAX_KEY_LEN, derive_key, normalize_label, slugify};
pub use types::*;
pub use validate::{ValidationError, validate_document, validate_fields};
