//! Checkbox rows: one or more labelled option groups on a line, with an
//! optional "if yes, explain" follow-up.

use form_schema_core::{Control, Field, FieldOption, FieldType, InputKind, derive_key, normalize_label};

use super::{LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;
use crate::parser::classify::{clean_label, dedupe_repeated_words, has_label_token};
use crate::parser::confidence::{CHECKBOX_ROW_CONFIDENCE, EXPLANATION_CONFIDENCE};
use crate::parser::grid;
use crate::parser::patterns::{Marker, PatternSet, is_yes};

pub(crate) struct CheckboxRowRule;

/// A label followed by the options ticked after it.
#[derive(Debug, Default)]
struct Group {
    label: String,
    options: Vec<String>,
}

impl Group {
    fn labelled(label: &str) -> Self {
        Self {
            label: clean_label(label),
            options: Vec::new(),
        }
    }

    fn push(&mut self, option: &str) {
        let option = dedupe_repeated_words(&clean_label(option));
        if option.is_empty() {
            return;
        }
        let normalized = normalize_label(&option);
        if self.options.iter().all(|o| normalize_label(o) != normalized) {
            self.options.push(option);
        }
    }
}

impl LineRule for CheckboxRowRule {
    fn name(&self) -> &'static str {
        "checkbox_row"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        let patterns = ctx.patterns;
        let text = line.text.as_str();
        let markers = patterns.find_markers(text);
        let last = markers.last()?;
        if ctx.grid_probe && grid::probe(ctx, line).is_some() {
            return None;
        }

        // A trailing "if yes, explain" clause, on this line or the next.
        let mut consumed = 1;
        let (body_end, mut explanation) = match patterns.explanation_start(&text[last.byte_end..]) {
            Some(offset) => {
                let start = last.byte_end + offset;
                (start, Some(clean_label(&text[start..])))
            }
            None => (text.len(), None),
        };
        if explanation.is_none()
            && let Some(next) = ctx.next_line()
            && let Some(clause) = leading_explanation(patterns, &next.text)
        {
            explanation = Some(clause);
            consumed = 2;
        }

        let mut absorb_prompt = false;
        let mut fields = Vec::new();

        if markers.len() == 1 {
            let prefix = clean_label(&text[..last.byte_start]);
            let after = clean_label(&text[last.byte_end..body_end]);
            let title = [prefix.as_str(), after.as_str()]
                .into_iter()
                .find(|t| has_label_token(t))
                .map(str::to_string)
                .or_else(|| {
                    absorb_prompt = ctx.prompt.is_some();
                    ctx.prompt.map(str::to_string)
                })?;
            let option = if after.is_empty() { "Yes".to_string() } else { after };
            let field = Field::new(&derive_key(&title), &title, FieldType::Checkbox)
                .with_control(Control::choice(&[option], false))
                .with_confidence(CHECKBOX_ROW_CONFIDENCE);
            fields.push(ctx.candidate(field, line, consumed, self.name()));
        } else {
            let mut groups = split_groups(patterns, text, &markers, body_end);
            if let Some(first) = groups.first_mut()
                && !has_label_token(&first.label)
            {
                match ctx.prompt {
                    Some(prompt) => {
                        first.label = prompt.to_string();
                        absorb_prompt = true;
                    }
                    None => first.label = grid::DEFAULT_GRID_TITLE.to_string(),
                }
            }

            for group in groups {
                if !has_label_token(&group.label) {
                    continue;
                }
                let field = if group.options.is_empty() {
                    Field::new(&derive_key(&group.label), &group.label, FieldType::Input)
                        .with_control(Control::input(InputKind::Text))
                } else {
                    let multi = all_that_apply(&group.label);
                    let field_type = if multi {
                        FieldType::Dropdown
                    } else {
                        FieldType::Radio
                    };
                    Field::new(&derive_key(&group.label), &group.label, field_type)
                        .with_control(Control::choice(&group.options, multi))
                };
                let field = field.with_confidence(CHECKBOX_ROW_CONFIDENCE);
                fields.push(ctx.candidate(field, line, consumed, self.name()));
            }
        }

        if let Some(clause) = explanation
            && let Some((parent_key, value)) = fields
                .iter()
                .rev()
                .find(|c| c.field.has_options())
                .map(|c| (c.field.key.clone(), explanation_value(&c.field.control.options)))
        {
            let key = format!("{parent_key}_explanation");
            let field = Field::new(&key, &clause, FieldType::Input)
                .with_control(Control::input(InputKind::Text))
                .with_confidence(EXPLANATION_CONFIDENCE)
                .conditional_on(&parent_key, &value);
            fields.push(ctx.candidate(field, line, consumed, self.name()));
        }

        if fields.is_empty() {
            return None;
        }
        Some(RuleOutcome::fields(fields, consumed, absorb_prompt))
    }
}

/// Returns the clause when `text` opens with "If yes, ..." and has no
/// checkboxes of its own.
fn leading_explanation(patterns: &PatternSet, text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() || !patterns.find_markers(trimmed).is_empty() {
        return None;
    }
    let start = patterns.explanation_start(trimmed)?;
    trimmed[..start]
        .chars()
        .all(|c| !c.is_alphanumeric())
        .then(|| clean_label(trimmed))
}

/// Splits a checkbox line into option groups.
///
/// The text after each marker is split on wide spacing; a final piece
/// ending in `:` or `?` is the label of the next group rather than an
/// option.
fn split_groups(patterns: &PatternSet, text: &str, markers: &[Marker], body_end: usize) -> Vec<Group> {
    let mut groups = vec![Group::labelled(&text[..markers[0].byte_start])];

    for (i, marker) in markers.iter().enumerate() {
        let end = markers
            .get(i + 1)
            .map_or(body_end, |next| next.byte_start)
            .min(body_end);
        let start = marker.byte_end.min(end);
        let parts: Vec<&str> = patterns
            .wide_parts(&text[start..end])
            .into_iter()
            .map(|(_, part)| part)
            .collect();

        let Some(group) = groups.last_mut() else {
            continue;
        };
        match parts.as_slice() {
            [] => {}
            [.., label] if parts.len() > 1 && (label.ends_with(':') || label.ends_with('?')) => {
                group.push(&parts[..parts.len() - 1].join(" "));
                groups.push(Group::labelled(label));
            }
            _ => group.push(&parts.join(" ")),
        }
    }

    groups
}

fn all_that_apply(label: &str) -> bool {
    let normalized = normalize_label(label);
    normalized.contains("all that apply")
        || normalized.contains("any that apply")
        || normalized.contains("check all")
        || normalized.contains("mark all")
}

/// Option value that enables an explanation: "yes" when present, else the
/// first option.
fn explanation_value(options: &[FieldOption]) -> String {
    options
        .iter()
        .find(|o| is_yes(&o.name))
        .or_else(|| options.first())
        .map(|o| o.value.clone())
        .unwrap_or_default()
}
