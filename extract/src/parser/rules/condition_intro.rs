//! "Do you have any of the following?" intros in the history sections.

use super::{LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;
use crate::parser::classify::clean_label;

pub(crate) struct ConditionIntroRule;

impl LineRule for ConditionIntroRule {
    fn name(&self) -> &'static str {
        "condition_intro"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        if !ctx.section.is_history() {
            return None;
        }
        let text = line.text.trim();
        let patterns = ctx.patterns;
        if !patterns.find_markers(text).is_empty()
            || patterns.has_fill(text)
            || !patterns.is_condition_intro(text)
        {
            return None;
        }
        Some(RuleOutcome::StartConditions {
            intro: clean_label(text),
        })
    }
}
