//! Labels followed by a blank-fill run.

use form_schema_core::{Field, derive_key};

use super::{LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;
use crate::parser::classify::{has_label_token, refine_type, split_segments};
use crate::parser::confidence::FILL_IN_CONFIDENCE;

const MIN_FILL_WIDTH: usize = 5;

pub(crate) struct FillInRule;

impl LineRule for FillInRule {
    fn name(&self) -> &'static str {
        "fill_in"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        let patterns = ctx.patterns;
        let text = line.text.as_str();
        if !patterns.find_markers(text).is_empty() {
            return None;
        }

        let fields: Vec<_> = split_segments(patterns, text, ctx.config.multi_field_min_spacing)
            .into_iter()
            .filter_map(|segment| {
                let fill = segment.fill?;
                if fill.width < MIN_FILL_WIDTH || !has_label_token(&segment.label) {
                    return None;
                }
                let fill_text = &text[fill.byte_start..fill.byte_end];
                let (field_type, control) = refine_type(patterns, &segment.label, fill_text);
                let field = Field::new(&derive_key(&segment.label), &segment.label, field_type)
                    .with_control(control)
                    .with_confidence(FILL_IN_CONFIDENCE);
                Some(ctx.candidate(field, line, 1, self.name()).with_blank_width(fill.width))
            })
            .collect();

        if fields.is_empty() {
            return None;
        }
        Some(RuleOutcome::fields(fields, 1, false))
    }
}
