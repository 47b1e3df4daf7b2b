//! Options written inline without checkboxes: "Y/N", "M or F",
//! "(circle one) Single Married".

use form_schema_core::{Control, Field, FieldType, derive_key, normalize_label};
use regex::Captures;

use super::{LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;
use crate::parser::classify::{clean_label, has_label_token, word_count};
use crate::parser::confidence::INLINE_OPTION_CONFIDENCE;
use crate::parser::patterns::PatternSet;

const MAX_OPTION_WORDS: usize = 4;

pub(crate) struct InlineOptionRule;

impl LineRule for InlineOptionRule {
    fn name(&self) -> &'static str {
        "inline_options"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        let patterns = ctx.patterns;
        let text = line.text.trim();
        if !patterns.find_markers(text).is_empty() {
            return None;
        }

        let (title, options, multi, absorb_prompt) = yes_no(patterns, text)
            .or_else(|| either_or(patterns, text))
            .map(|(title, options)| (title, options, false, false))
            .or_else(|| choose(patterns, text, ctx.prompt))?;

        let field_type = if multi {
            FieldType::Dropdown
        } else {
            FieldType::Radio
        };
        let field = Field::new(&derive_key(&title), &title, field_type)
            .with_control(Control::choice(&options, multi))
            .with_confidence(INLINE_OPTION_CONFIDENCE);
        let candidate = ctx.candidate(field, line, 1, self.name());
        Some(RuleOutcome::fields(vec![candidate], 1, absorb_prompt))
    }
}

/// "Do you smoke?  Yes / No"
fn yes_no(patterns: &PatternSet, text: &str) -> Option<(String, Vec<String>)> {
    let found = patterns.yes_no.find(text)?;
    let label = text[..found.start()]
        .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '(' | ',' | '_'));
    let label = clean_label(label);
    if !has_label_token(&label) {
        return None;
    }
    Some((label, vec!["Yes".to_string(), "No".to_string()]))
}

/// "Sex: M or F"
fn either_or(patterns: &PatternSet, text: &str) -> Option<(String, Vec<String>)> {
    let caps = patterns.either_or.captures(text)?;
    let label = clean_label(caps.name("label")?.as_str());
    if !has_label_token(&label) {
        return None;
    }
    let title = if &caps["sep"] == "?" {
        format!("{label}?")
    } else {
        label
    };

    let a = expand_letter(&caps["a"]);
    let b = expand_letter(&caps["b"]);
    if normalize_label(&a) == normalize_label(&b) {
        return None;
    }
    Some((title, vec![a, b]))
}

fn expand_letter(option: &str) -> String {
    match option {
        "Y" | "y" => "Yes".to_string(),
        "N" | "n" => "No".to_string(),
        "M" | "m" => "Male".to_string(),
        "F" | "f" => "Female".to_string(),
        other => other.to_string(),
    }
}

/// "Marital Status (circle one): Single  Married  Divorced"
fn choose(
    patterns: &PatternSet,
    text: &str,
    prompt: Option<&str>,
) -> Option<(String, Vec<String>, bool, bool)> {
    let caps: Captures<'_> = patterns.choose.captures(text)?;
    let scope = normalize_label(&caps["scope"]);
    let multi = scope.starts_with("all") || scope.starts_with("any");

    let options = split_options(patterns, &caps["rest"]);
    if options.len() < 2 {
        return None;
    }

    let label = clean_label(&caps["label"]);
    let (title, absorb) = if has_label_token(&label) {
        (label, false)
    } else if let Some(prompt) = prompt {
        (prompt.to_string(), true)
    } else {
        (instruction_title(text, &caps)?, false)
    };
    Some((title, options, multi, absorb))
}

/// The instruction itself ("Please circle one") as written, for lines
/// that carry no other label.
fn instruction_title(text: &str, caps: &Captures<'_>) -> Option<String> {
    let start = caps.name("label").map_or(0, |label| label.end());
    let end = caps.name("rest").map_or(text.len(), |rest| rest.start());
    let instruction = text
        .get(start..end)?
        .trim_matches(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | ':' | '-'));
    let instruction = clean_label(instruction);
    let mut chars = instruction.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Splits an inline option list on wide gaps, slashes or commas, falling
/// back to single spaces when none are present.
fn split_options(patterns: &PatternSet, rest: &str) -> Vec<String> {
    let rest = rest.trim();
    let delimited = patterns.wide_gap.is_match(rest) || rest.contains(['/', ',', ';']);
    let raw: Vec<&str> = if delimited {
        patterns
            .wide_gap
            .split(rest)
            .flat_map(|part| part.split(['/', ',', ';']))
            .collect()
    } else {
        rest.split_whitespace().collect()
    };

    let mut options: Vec<String> = Vec::new();
    for piece in raw {
        let option = clean_label(piece);
        if !has_label_token(&option) || word_count(&option) > MAX_OPTION_WORDS {
            continue;
        }
        if options
            .iter()
            .any(|existing| normalize_label(existing) == normalize_label(&option))
        {
            continue;
        }
        options.push(option);
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::rules::testing::{Fixture, fields_of};

    fn single(text: &str) -> Field {
        let fixture = Fixture::new(&[text]);
        let mut fields = fields_of(fixture.apply(&InlineOptionRule, 0));
        assert_eq!(fields.len(), 1);
        fields.remove(0).field
    }

    #[test]
    fn test_trailing_yes_no() {
        let field = single("Do you smoke?   Yes / No");
        assert_eq!(field.title, "Do you smoke?");
        assert_eq!(field.field_type, FieldType::Radio);
        assert_eq!(field.control.option_names(), vec!["Yes", "No"]);
        assert_eq!(field.key, "smoke");

        let field = single("Are you pregnant? (Y/N)");
        assert_eq!(field.title, "Are you pregnant?");
    }

    #[test]
    fn test_either_or_expands_letters() {
        let field = single("Sex: M or F");
        assert_eq!(field.title, "Sex");
        assert_eq!(field.control.option_names(), vec!["Male", "Female"]);

        let field = single("Preferred contact: Phone or Email");
        assert_eq!(field.control.option_names(), vec!["Phone", "Email"]);
    }

    #[test]
    fn test_circle_one() {
        let field = single("Marital Status (circle one): Single  Married  Divorced  Widowed");
        assert_eq!(field.title, "Marital Status");
        assert_eq!(field.control.multi, Some(false));
        assert_eq!(field.control.options.len(), 4);
    }

    #[test]
    fn test_check_all_that_apply_is_multi() {
        let field = single("Pain relief used (check all that apply): Aspirin, Ibuprofen, Tylenol");
        assert_eq!(field.field_type, FieldType::Dropdown);
        assert_eq!(field.control.multi, Some(true));
        assert_eq!(field.control.option_names(), vec!["Aspirin", "Ibuprofen", "Tylenol"]);
    }

    #[test]
    fn test_unlabelled_choice_absorbs_prompt() {
        let fixture = Fixture::new(&["How did you hear about us?", "Circle one: Friend  Internet  Mailer"]);
        let mut ctx = fixture.context(1);
        ctx.prompt = Some("How did you hear about us?");
        match InlineOptionRule.apply(&ctx, &fixture.lines[1]) {
            Some(RuleOutcome::Fields {
                fields,
                absorb_prompt,
                ..
            }) => {
                assert!(absorb_prompt);
                assert_eq!(fields[0].field.title, "How did you hear about us?");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unlabelled_choice_keeps_instruction_wording() {
        let field = single("Please circle one: Cash  Check  Credit card");
        assert_eq!(field.title, "Please circle one");
        assert_eq!(field.control.option_names(), vec!["Cash", "Check", "Credit card"]);

        let field = single("(check all that apply) Floss  Mouthwash  Electric toothbrush");
        assert_eq!(field.title, "Check all that apply");
        assert_eq!(field.control.multi, Some(true));
    }

    #[test]
    fn test_plain_lines_decline() {
        let fixture = Fixture::new(&["Patient Name ____________"]);
        assert!(fixture.apply(&InlineOptionRule, 0).is_none());
        let fixture = Fixture::new(&["Yes"]);
        assert!(fixture.apply(&InlineOptionRule, 0).is_none());
    }
}
