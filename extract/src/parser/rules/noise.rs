//! Boilerplate and separator lines.

use super::{DiscardReason, LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;
use crate::parser::patterns::PatternSet;

pub(crate) struct NoiseRule;

impl LineRule for NoiseRule {
    fn name(&self) -> &'static str {
        "noise"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        is_noise_line(ctx.patterns, &line.text).then_some(RuleOutcome::Discard(DiscardReason::Noise))
    }
}

/// Returns `true` for separators, bare fill runs and lines matching the
/// noise table. Lines with checkboxes or blanks are never table noise.
pub(crate) fn is_noise_line(patterns: &PatternSet, text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return false;
    }
    let has_markers = !patterns.find_markers(trimmed).is_empty();
    if !has_markers && !trimmed.chars().any(char::is_alphanumeric) {
        return true;
    }
    if has_markers || patterns.has_fill(trimmed) {
        return false;
    }
    patterns.is_noise(trimmed)
}
