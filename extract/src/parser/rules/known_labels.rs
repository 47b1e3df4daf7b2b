//! Lines carrying several known short labels ("First ____ MI __ Last ____").

use form_schema_core::{Field, derive_key};

use super::{LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;
use crate::parser::classify::{has_label_token, refine_type, split_segments};
use crate::parser::confidence::KNOWN_LABEL_CONFIDENCE;

const MIN_KNOWN: usize = 2;

pub(crate) struct KnownLabelRule;

impl LineRule for KnownLabelRule {
    fn name(&self) -> &'static str {
        "known_labels"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        let patterns = ctx.patterns;
        let text = line.text.as_str();
        if !patterns.find_markers(text).is_empty() {
            return None;
        }

        let segments = split_segments(patterns, text, ctx.config.multi_field_min_spacing);
        let known = segments
            .iter()
            .filter(|segment| patterns.is_known_label(&segment.label))
            .count();
        if known < MIN_KNOWN {
            return None;
        }

        let fields: Vec<_> = segments
            .iter()
            .filter(|segment| has_label_token(&segment.label))
            .filter(|segment| patterns.is_known_label(&segment.label) || segment.fill.is_some())
            .map(|segment| {
                let fill_text = segment
                    .fill
                    .map_or("", |fill| &text[fill.byte_start..fill.byte_end]);
                let (field_type, control) = refine_type(patterns, &segment.label, fill_text);
                let field = Field::new(&derive_key(&segment.label), &segment.label, field_type)
                    .with_control(control)
                    .with_confidence(KNOWN_LABEL_CONFIDENCE);
                let candidate = ctx.candidate(field, line, 1, self.name());
                match segment.fill {
                    Some(fill) => candidate.with_blank_width(fill.width),
                    None => candidate,
                }
            })
            .collect();

        Some(RuleOutcome::fields(fields, 1, false))
    }
}

#[cfg(test)]
mod tests {
    use form_schema_core::{FieldType, InputKind};

    use super::*;
    use crate::parser::rules::testing::{Fixture, fields_of};

    #[test]
    fn test_name_line_splits_into_known_labels() {
        let fixture = Fixture::new(&["First__________________  MI_____  Last_______________________"]);
        let fields = fields_of(fixture.apply(&KnownLabelRule, 0));
        let titles: Vec<_> = fields.iter().map(|c| c.field.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "MI", "Last"]);
        assert_eq!(fields[0].field.key, "first");
    }

    #[test]
    fn test_spacing_separated_labels_without_fill() {
        let fixture = Fixture::new(&["City            State           Zip"]);
        let fields = fields_of(fixture.apply(&KnownLabelRule, 0));
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[1].field.field_type, FieldType::States);
        assert_eq!(fields[2].field.control.input_type, Some(InputKind::Zip));
    }

    #[test]
    fn test_unknown_filled_segment_is_kept() {
        let fixture = Fixture::new(&["Home Phone ____________    Best time to call ________"]);
        assert!(fixture.apply(&KnownLabelRule, 0).is_none());

        let fixture = Fixture::new(&["Cell ________    Email ____________    Preferred pharmacy ________"]);
        let fields = fields_of(fixture.apply(&KnownLabelRule, 0));
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[2].field.title, "Preferred pharmacy");
    }

    #[test]
    fn test_single_known_label_declines() {
        let fixture = Fixture::new(&["Occupation ______________________"]);
        assert!(fixture.apply(&KnownLabelRule, 0).is_none());
    }
}
