//! Field type definitions for form structure modeling.
//!
//! This module defines the data model produced by the extraction engine.
//! The types are designed for serialization with [`serde`] and round-trip
//! through JSON and YAML with a fixed object shape.

use serde::{Deserialize, Serialize};

use crate::slug::slugify;

/// Version of the field contract (semver).
///
/// Embedded in every [`FormDocument`](crate::FormDocument) to track
/// compatibility across releases.
pub const SCHEMA_CONTRACT_VERSION: &str = "1.0.0";

/// Logical section a field belongs to.
///
/// Serialized with its human-readable label (e.g. `"Patient Information"`).
///
/// # Examples
///
/// ```
/// use form_schema_core::Section;
///
/// assert_eq!(Section::default(), Section::General);
/// assert_eq!(Section::MedicalHistory.label(), "Medical History");
/// assert_eq!(Section::from_label("dental history"), Some(Section::DentalHistory));
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub enum Section {
    #[serde(rename = "Patient Information")]
    PatientInformation,
    #[serde(rename = "Medical History")]
    MedicalHistory,
    #[serde(rename = "Dental History")]
    DentalHistory,
    #[serde(rename = "Insurance")]
    Insurance,
    #[serde(rename = "Emergency Contact")]
    EmergencyContact,
    #[serde(rename = "Consent")]
    Consent,
    #[serde(rename = "Signature")]
    Signature,
    /// Fallback section for fields with no better home (the default).
    #[default]
    #[serde(rename = "General")]
    General,
}

impl Section {
    /// Every section, in declaration order.
    pub const ALL: [Section; 8] = [
        Section::PatientInformation,
        Section::MedicalHistory,
        Section::DentalHistory,
        Section::Insurance,
        Section::EmergencyContact,
        Section::Consent,
        Section::Signature,
        Section::General,
    ];

    /// Human-readable label, identical to the serialized form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::PatientInformation => "Patient Information",
            Self::MedicalHistory => "Medical History",
            Self::DentalHistory => "Dental History",
            Self::Insurance => "Insurance",
            Self::EmergencyContact => "Emergency Contact",
            Self::Consent => "Consent",
            Self::Signature => "Signature",
            Self::General => "General",
        }
    }

    /// Parses a label case-insensitively. Underscores count as spaces.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim().replace('_', " ");
        Self::ALL
            .into_iter()
            .find(|section| section.label().eq_ignore_ascii_case(&wanted))
    }

    /// Returns `true` for the two history sections where condition lists live.
    pub fn is_history(&self) -> bool {
        matches!(self, Self::MedicalHistory | Self::DentalHistory)
    }

    /// Preference rank used when duplicates from different sections collapse.
    ///
    /// Higher wins. `General` always loses to a specific section.
    pub fn specificity(&self) -> u8 {
        match self {
            Self::PatientInformation => 7,
            Self::MedicalHistory => 6,
            Self::DentalHistory => 5,
            Self::Insurance => 4,
            Self::EmergencyContact => 3,
            Self::Consent => 2,
            Self::Signature => 1,
            Self::General => 0,
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Kind of form control a field renders as.
///
/// # Examples
///
/// ```
/// use form_schema_core::FieldType;
///
/// assert!(FieldType::Radio.is_choice());
/// assert!(!FieldType::Date.is_choice());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text (the default).
    #[default]
    Input,
    Date,
    /// Single choice among options.
    Radio,
    /// Choice list; `control.multi` marks multi-select.
    Dropdown,
    Checkbox,
    Signature,
    /// Agreement/consent text block.
    Terms,
    /// US state picker with an implicit option list.
    States,
}

impl FieldType {
    /// Returns `true` for types that must carry at least one option.
    pub fn is_choice(&self) -> bool {
        matches!(self, Self::Radio | Self::Dropdown | Self::Checkbox)
    }

    /// Lowercase name, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Input => "input",
            Self::Date => "date",
            Self::Radio => "radio",
            Self::Dropdown => "dropdown",
            Self::Checkbox => "checkbox",
            Self::Signature => "signature",
            Self::Terms => "terms",
            Self::States => "states",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input subtype hint for `input` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    #[default]
    Text,
    Phone,
    Email,
    Ssn,
    Zip,
    Number,
}

/// One selectable option of a choice field.
///
/// `value` is the slug of `name` unless set explicitly.
///
/// # Examples
///
/// ```
/// use form_schema_core::FieldOption;
///
/// let opt = FieldOption::new("Yes");
/// assert_eq!(opt.name, "Yes");
/// assert_eq!(opt.value, "yes");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub name: String,
    pub value: String,
}

impl FieldOption {
    /// Creates an option whose value is derived from its name.
    pub fn new(name: &str) -> Self {
        let name = name.trim().to_string();
        let value = slugify(&name);
        Self { name, value }
    }
}

/// Type-specific control payload.
///
/// A single struct with optional members keeps the serialized shape fixed
/// regardless of field type; unused members are omitted from the output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Control {
    /// Ordered options for choice types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    /// Multi-select flag for choice types.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multi: Option<bool>,
    /// Input subtype for `input` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputKind>,
    /// Agreement body for `terms` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Control {
    /// Control for a text-like input with the given subtype.
    pub fn input(kind: InputKind) -> Self {
        Self {
            input_type: Some(kind),
            ..Default::default()
        }
    }

    /// Control for a choice field built from option names, in order.
    pub fn choice<S: AsRef<str>>(names: &[S], multi: bool) -> Self {
        Self {
            options: names.iter().map(|n| FieldOption::new(n.as_ref())).collect(),
            multi: Some(multi),
            ..Default::default()
        }
    }

    /// Control for a terms block.
    pub fn terms(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    /// Returns `true` if this control carries no data at all.
    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
            && self.multi.is_none()
            && self.input_type.is_none()
            && self.text.is_none()
    }

    /// Option names in order.
    pub fn option_names(&self) -> Vec<&str> {
        self.options.iter().map(|o| o.name.as_str()).collect()
    }
}

/// Reference from a follow-up field to the answer that enables it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditional {
    /// Key of the controlling field.
    pub key: String,
    /// Option value of the controlling field that enables this one.
    pub value: String,
}

/// A structured form-input descriptor.
///
/// Use [`Field::new`] and the builder methods to create fields.
///
/// # Examples
///
/// ```
/// use form_schema_core::{Control, Field, FieldType, Section};
///
/// let field = Field::new("gender", "Gender", FieldType::Radio)
///     .with_section(Section::PatientInformation)
///     .with_control(Control::choice(&["Male", "Female"], false));
///
/// assert_eq!(field.control.option_names(), vec!["Male", "Female"]);
/// assert!(field.has_options());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Unique slug identifier.
    pub key: String,
    /// Human-readable label.
    pub title: String,
    pub section: Section,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub control: Control,
    /// Matching/parsing certainty (0.0 - 1.0).
    #[serde(default)]
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional_on: Option<Conditional>,
}

impl Field {
    /// Creates a field in the `General` section with an empty control.
    pub fn new(key: &str, title: &str, field_type: FieldType) -> Self {
        Self {
            key: key.to_string(),
            title: title.trim().to_string(),
            section: Section::General,
            field_type,
            optional: false,
            control: Control::default(),
            confidence: 1.0,
            conditional_on: None,
        }
    }

    /// Sets the section.
    pub fn with_section(mut self, section: Section) -> Self {
        self.section = section;
        self
    }

    /// Sets the control payload.
    pub fn with_control(mut self, control: Control) -> Self {
        self.control = control;
        self
    }

    /// Sets the confidence, clamped to [0, 1].
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence.clamp(0.0, 1.0);
        self
    }

    /// Makes this field conditional on `key` having `value`.
    pub fn conditional_on(mut self, key: &str, value: &str) -> Self {
        self.conditional_on = Some(Conditional {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Marks the field optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Returns `true` when the control carries at least one option.
    pub fn has_options(&self) -> bool {
        !self.control.options.is_empty()
    }

    /// Replaces a choice field with no options by a plain text input.
    ///
    /// Returns `true` if the field was downgraded.
    pub fn downgrade_if_optionless(&mut self) -> bool {
        if self.field_type.is_choice() && !self.has_options() {
            self.field_type = FieldType::Input;
            self.control = Control::input(InputKind::Text);
            return true;
        }
        false
    }
}

/// Canonical dictionary entry used to normalize detected fields.
///
/// # Examples
///
/// ```
/// use form_schema_core::{FieldType, Template};
///
/// let template = Template::new("first_name", FieldType::Input)
///     .with_aliases(&["first name", "given name"]);
/// assert_eq!(template.aliases.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub canonical_key: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub default_type: FieldType,
    #[serde(default)]
    pub default_control: Control,
    /// Canonical title applied on match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Section applied to matched fields still in `General`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
}

impl Template {
    /// Creates a template with no aliases and an empty default control.
    pub fn new(canonical_key: &str, default_type: FieldType) -> Self {
        Self {
            canonical_key: canonical_key.to_string(),
            aliases: Vec::new(),
            default_type,
            default_control: Control::default(),
            title: None,
            section: None,
        }
    }

    /// Appends aliases.
    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.to_string()));
        self
    }

    /// Sets the default control.
    pub fn with_control(mut self, control: Control) -> Self {
        self.default_control = control;
        self
    }

    /// Sets the canonical title.
    pub fn with_title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// Sets the default section.
    pub fn with_section(mut self, section: Section) -> Self {
        self.section = Some(section);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_serializes_fixed_shape() {
        let field = Field::new("gender", "Gender", FieldType::Radio)
            .with_section(Section::PatientInformation)
            .with_control(Control::choice(&["Male", "Female"], false));

        let json = serde_json::to_value(&field).unwrap();
        assert_eq!(json["key"], "gender");
        assert_eq!(json["section"], "Patient Information");
        assert_eq!(json["type"], "radio");
        assert_eq!(json["optional"], false);
        assert_eq!(json["control"]["options"][0]["name"], "Male");
        assert_eq!(json["control"]["options"][0]["value"], "male");
        assert_eq!(json["control"]["multi"], false);
        assert!(json.get("conditional_on").is_none());
    }

    #[test]
    fn test_section_from_label_accepts_snake_case() {
        assert_eq!(
            Section::from_label("emergency_contact"),
            Some(Section::EmergencyContact)
        );
        assert_eq!(Section::from_label("nowhere"), None);
    }

    #[test]
    fn test_general_is_least_specific() {
        assert!(
            Section::ALL
                .iter()
                .filter(|s| **s != Section::General)
                .all(|s| s.specificity() > Section::General.specificity())
        );
    }

    #[test]
    fn test_downgrade_optionless_choice() {
        let mut field = Field::new("colors", "Colors", FieldType::Dropdown);
        assert!(field.downgrade_if_optionless());
        assert_eq!(field.field_type, FieldType::Input);
        assert_eq!(field.control.input_type, Some(InputKind::Text));

        let mut date = Field::new("dob", "Date of Birth", FieldType::Date);
        assert!(!date.downgrade_if_optionless());
    }

    #[test]
    fn test_template_deserializes_with_defaults() {
        let raw = r#"{"canonical_key": "email", "default_type": "input"}"#;
        let template: Template = serde_json::from_str(raw).unwrap();
        assert!(template.aliases.is_empty());
        assert!(template.default_control.is_empty());
        assert_eq!(template.section, None);
    }
}
