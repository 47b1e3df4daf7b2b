//! Bulleted and numbered items continuing a terms block.

use super::{LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;

pub(crate) struct ListItemRule;

impl LineRule for ListItemRule {
    fn name(&self) -> &'static str {
        "list_item"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        if !ctx.follows_terms(line) || !ctx.patterns.list_item.is_match(&line.text) {
            return None;
        }
        if !ctx.patterns.find_markers(&line.text).is_empty() {
            return None;
        }
        Some(RuleOutcome::AppendTerms {
            text: line.text.trim().to_string(),
            new_paragraph: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use form_schema_core::{Control, Field, FieldType};

    use super::*;
    use crate::parser::ast::{FieldCandidate, SourceSpan};
    use crate::parser::rules::testing::Fixture;

    fn terms_at(line: usize) -> FieldCandidate {
        let field = Field::new("consent", "Consent", FieldType::Terms)
            .with_control(Control::terms("I agree to the following:"));
        FieldCandidate::new(field, SourceSpan::single(line), "fallback")
    }

    #[test]
    fn test_appends_after_terms() {
        let fixture = Fixture::new(&["I agree to the following:", "1. Payment is due at service."]);
        let previous = terms_at(0);
        let mut ctx = fixture.context(1);
        ctx.previous = Some(&previous);
        let outcome = ListItemRule.apply(&ctx, &fixture.lines[1]);
        assert!(matches!(
            outcome,
            Some(RuleOutcome::AppendTerms { ref text, new_paragraph: true }) if text == "1. Payment is due at service."
        ));
    }

    #[test]
    fn test_ignores_items_without_terms() {
        let fixture = Fixture::new(&["a) Fluoride treatment"]);
        assert!(fixture.apply(&ListItemRule, 0).is_none());
    }

    #[test]
    fn test_ignores_distant_terms() {
        let fixture = Fixture::new(&["x", "", "", "", "- late bullet"]);
        let previous = terms_at(0);
        let mut ctx = fixture.context(4);
        ctx.previous = Some(&previous);
        assert!(ListItemRule.apply(&ctx, &fixture.lines[4]).is_none());
    }
}
