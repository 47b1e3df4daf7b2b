//! Template merge: normalize a matched field onto its canonical template.

use form_schema_core::{Control, Field, Section, Template};

/// Applies `template` to `field`.
///
/// The key always becomes the canonical key. Type and default control come
/// from the template unless the field already carries locally detected
/// options; then the options are kept and only the type is normalized (and
/// only to a type that can hold options). A template title replaces the
/// detected title; a template section applies only to `General` fields.
///
/// Returns the previous key when the key changed.
///
/// # Examples
///
/// ```
/// use form_schema_catalog::apply_template;
/// use form_schema_core::{Control, Field, FieldType, Template};
///
/// let template = Template::new("marital_status", FieldType::Dropdown)
///     .with_control(Control::choice(&["Single", "Married", "Divorced", "Widowed"], false));
///
/// let mut field = Field::new("marital", "Marital Status", FieldType::Radio)
///     .with_control(Control::choice(&["Married", "Single"], false));
/// let previous = apply_template(&mut field, &template);
///
/// assert_eq!(previous.as_deref(), Some("marital"));
/// assert_eq!(field.key, "marital_status");
/// assert_eq!(field.field_type, FieldType::Dropdown);
/// // Locally detected options win over the template's defaults.
/// assert_eq!(field.control.option_names(), vec!["Married", "Single"]);
/// ```
pub fn apply_template(field: &mut Field, template: &Template) -> Option<String> {
    let previous = if field.key != template.canonical_key {
        Some(std::mem::replace(
            &mut field.key,
            template.canonical_key.clone(),
        ))
    } else {
        None
    };

    if field.has_options() {
        if template.default_type.is_choice() {
            field.field_type = template.default_type;
        }
    } else {
        let type_changed = field.field_type != template.default_type;
        field.field_type = template.default_type;
        if !template.default_control.is_empty() {
            field.control = template.default_control.clone();
        } else if type_changed {
            field.control = Control::default();
        }
    }

    if let Some(title) = &template.title {
        field.title = title.clone();
    }
    if field.section == Section::General
        && let Some(section) = template.section
    {
        field.section = section;
    }

    previous
}

#[cfg(test)]
mod tests {
    use super::*;
    use form_schema_core::{FieldType, InputKind};

    #[test]
    fn test_template_control_fills_optionless_field() {
        let template = Template::new("gender", FieldType::Radio)
            .with_control(Control::choice(&["Male", "Female"], false))
            .with_section(Section::PatientInformation);
        let mut field = Field::new("sex", "Sex", FieldType::Input);

        apply_template(&mut field, &template);
        assert_eq!(field.field_type, FieldType::Radio);
        assert_eq!(field.control.option_names(), vec!["Male", "Female"]);
        assert_eq!(field.section, Section::PatientInformation);
    }

    #[test]
    fn test_non_choice_template_keeps_detected_choice_type() {
        let template = Template::new("employer", FieldType::Input);
        let mut field = Field::new("employer", "Employer", FieldType::Radio)
            .with_control(Control::choice(&["Full time", "Part time"], false));

        let previous = apply_template(&mut field, &template);
        assert_eq!(previous, None);
        assert_eq!(field.field_type, FieldType::Radio);
        assert_eq!(field.control.options.len(), 2);
    }

    #[test]
    fn test_specific_section_is_not_overridden() {
        let template = Template::new("phone", FieldType::Input)
            .with_control(Control::input(InputKind::Phone))
            .with_section(Section::PatientInformation);
        let mut field = Field::new("phone", "Phone", FieldType::Input)
            .with_section(Section::EmergencyContact);

        apply_template(&mut field, &template);
        assert_eq!(field.section, Section::EmergencyContact);
        assert_eq!(field.control.input_type, Some(InputKind::Phone));
    }

    #[test]
    fn test_same_type_keeps_detected_control_when_template_has_none() {
        let template = Template::new("home_phone", FieldType::Input).with_title("Home Phone");
        let mut field = Field::new("home_phone_number", "Home phone #", FieldType::Input)
            .with_control(Control::input(InputKind::Phone));

        apply_template(&mut field, &template);
        assert_eq!(field.title, "Home Phone");
        assert_eq!(field.control.input_type, Some(InputKind::Phone));
    }
}
