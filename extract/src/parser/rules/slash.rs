//! Slash-combined labels sharing one blank ("Apt/Unit/Suite ______").

use form_schema_core::{Field, derive_key};

use super::{LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;
use crate::parser::classify::{clean_label, refine_type, word_count};
use crate::parser::confidence::SLASH_CONFIDENCE;
use crate::parser::patterns::{is_conjunction, is_date_part, is_yes_no};

const MAX_COMPONENT_WORDS: usize = 3;

pub(crate) struct SlashRule;

impl LineRule for SlashRule {
    fn name(&self) -> &'static str {
        "slash"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        let patterns = ctx.patterns;
        let text = line.text.as_str();
        if !patterns.find_markers(text).is_empty() {
            return None;
        }

        let fills = patterns.find_fills(text);
        let [fill] = fills.as_slice() else {
            return None;
        };
        if !text[fill.byte_end..].trim().is_empty() {
            return None;
        }

        let label = clean_label(&text[..fill.byte_start]);
        if !label.contains('/') || patterns.has_signature_keyword(&label) {
            return None;
        }

        let components: Vec<String> = label.split('/').map(clean_label).collect();
        if components.iter().any(|c| {
            is_date_part(c) || is_yes_no(c) || is_conjunction(c) || word_count(c) > MAX_COMPONENT_WORDS
        }) {
            return None;
        }

        let accepted: Vec<&String> = components
            .iter()
            .filter(|c| c.chars().filter(|ch| ch.is_alphanumeric()).count() >= 2 || patterns.is_abbreviation(c))
            .collect();
        if accepted.len() < 2 {
            return None;
        }

        let share = fill.width / accepted.len();
        let fields = accepted
            .into_iter()
            .map(|component| {
                let (field_type, control) = refine_type(patterns, component, "");
                let field = Field::new(&derive_key(component), component, field_type)
                    .with_control(control)
                    .with_confidence(SLASH_CONFIDENCE);
                ctx.candidate(field, line, 1, self.name()).with_blank_width(share)
            })
            .collect();

        Some(RuleOutcome::fields(fields, 1, false))
    }
}

#[cfg(test)]
mod tests {
    use form_schema_core::FieldType;

    use super::*;
    use crate::parser::rules::testing::{Fixture, fields_of};

    fn titles(text: &str) -> Option<Vec<String>> {
        let fixture = Fixture::new(&[text]);
        fixture
            .apply(&SlashRule, 0)
            .map(|outcome| fields_of(Some(outcome)).into_iter().map(|c| c.field.title).collect())
    }

    #[test]
    fn test_apt_unit_suite_splits_blank() {
        let fixture = Fixture::new(&["Apt/Unit/Suite____________"]);
        let fields = fields_of(fixture.apply(&SlashRule, 0));
        let keys: Vec<_> = fields.iter().map(|c| c.field.key.as_str()).collect();
        assert_eq!(keys, vec!["apt", "unit", "suite"]);
        assert!(fields.iter().all(|c| c.blank_width == Some(4)));
        assert!(fields.iter().all(|c| c.field.field_type == FieldType::Input));
    }

    #[test]
    fn test_city_state_zip_types() {
        let fixture = Fixture::new(&["City/State/Zip: ______________________"]);
        let fields = fields_of(fixture.apply(&SlashRule, 0));
        assert_eq!(fields[1].field.field_type, FieldType::States);
        assert_eq!(
            fields[2].field.control.input_type,
            Some(form_schema_core::InputKind::Zip)
        );
    }

    #[test]
    fn test_rejected_components() {
        assert_eq!(titles("Birthdate mm/dd/yyyy ________"), None);
        assert_eq!(titles("Yes/No ______"), None);
        assert_eq!(titles("Patient/Guardian Signature ________"), None);
        assert_eq!(titles("Home/Work ______ Cell ______"), None);
        assert_eq!(titles("Apt/Unit"), None);
    }

    #[test]
    fn test_abbreviation_component_kept() {
        assert_eq!(
            titles("First/MI/Last ______________"),
            Some(vec!["First".to_string(), "MI".to_string(), "Last".to_string()])
        );
    }
}
