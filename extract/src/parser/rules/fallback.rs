//! Last resort: consent text, question lines and plain labels.

use form_schema_core::{Control, Field, FieldType, Section, derive_key};

use super::{DiscardReason, LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;
use crate::parser::classify::{clean_label, has_label_token, is_descriptive, refine_type, word_count};
use crate::parser::confidence::{FALLBACK_CONFIDENCE, TERMS_CONFIDENCE};

const CONSENT_PARAGRAPH_WORDS: usize = 6;
const TERMS_TITLE_WORDS: usize = 10;

pub(crate) struct FallbackRule;

impl LineRule for FallbackRule {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        let patterns = ctx.patterns;
        let text = line.text.trim();
        let is_prompt = text.ends_with('?') || text.ends_with(':');

        let opener = patterns.is_consent_opener(text);
        let consent_paragraph = ctx.section == Section::Consent
            && !is_prompt
            && word_count(text) >= CONSENT_PARAGRAPH_WORDS;
        let continues_terms = ctx.follows_terms(line) && is_descriptive(text);
        if opener || consent_paragraph || continues_terms {
            if ctx.follows_terms(line) {
                return Some(RuleOutcome::AppendTerms {
                    text: text.to_string(),
                    new_paragraph: opener,
                });
            }
            let title = terms_title(text);
            let field = Field::new(&derive_key(&title), &title, FieldType::Terms)
                .with_control(Control::terms(text))
                .with_confidence(TERMS_CONFIDENCE);
            let candidate = ctx.candidate(field, line, 1, self.name());
            return Some(RuleOutcome::fields(vec![candidate], 1, false));
        }

        if text.chars().count() < ctx.config.min_line_length
            || !has_label_token(text)
            || is_descriptive(text)
        {
            return Some(RuleOutcome::Discard(DiscardReason::Dropped));
        }

        let without_fill = match patterns.find_fills(text).last() {
            Some(fill) if text[fill.byte_end..].trim().is_empty() => &text[..fill.byte_start],
            _ => text,
        };
        let title = clean_label(without_fill);
        if !has_label_token(&title) {
            return Some(RuleOutcome::Discard(DiscardReason::Dropped));
        }

        let (field_type, control) = refine_type(patterns, &title, "");
        let field = Field::new(&derive_key(&title), &title, field_type)
            .with_control(control)
            .with_confidence(FALLBACK_CONFIDENCE);
        let mut candidate = ctx.candidate(field, line, 1, self.name());
        candidate.prompt = is_prompt || without_fill.trim_end().ends_with(':');
        Some(RuleOutcome::fields(vec![candidate], 1, false))
    }
}

/// First sentence of a terms paragraph, cut to a few words.
fn terms_title(text: &str) -> String {
    let sentence = text
        .split_inclusive(['.', ';'])
        .next()
        .unwrap_or(text);
    let words: Vec<&str> = sentence.split_whitespace().take(TERMS_TITLE_WORDS).collect();
    clean_label(&words.join(" "))
}
