//! Line-shape classification helpers.
//!
//! Pure functions shared by the rules and the grid parser: label cleanup,
//! segment splitting, the descriptive-paragraph heuristic and field type
//! refinement from keywords.

use form_schema_core::{Control, FieldType, InputKind, normalize_label};

use super::patterns::{FillSpan, PatternSet};

const PRONOUNS: &[&str] = &["i", "we", "you", "your", "our", "us", "my", "me"];
const LONG_LINE_WORDS: usize = 12;
const SENTENCE_WORDS: usize = 6;

/// A label with the blank-fill run that follows it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Segment {
    pub label: String,
    pub fill: Option<FillSpan>,
}

/// Trims fill characters, bullets and trailing colons from a label and
/// collapses inner whitespace.
pub(crate) fn clean_label(raw: &str) -> String {
    let trimmed = raw
        .trim_start_matches(|c: char| {
            c.is_whitespace() || matches!(c, '_' | '.' | '-' | '…' | ':' | '*' | '•' | '·' | '|' | ')')
        })
        .trim_end_matches(|c: char| {
            c.is_whitespace()
                || matches!(c, '_' | '.' | '-' | '…' | ':' | '*' | '•' | '·' | '|' | '(' | ',')
        });
    trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes immediately repeated words ("Whiter Whiter teeth").
pub(crate) fn dedupe_repeated_words(text: &str) -> String {
    let mut words: Vec<&str> = Vec::new();
    for word in text.split_whitespace() {
        if words
            .last()
            .is_some_and(|last| last.eq_ignore_ascii_case(word))
        {
            continue;
        }
        words.push(word);
    }
    words.join(" ")
}

/// Splits `text` on runs of at least `min_spaces` spaces.
pub(crate) fn split_on_spacing(text: &str, min_spaces: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0usize;
    let mut run_start: Option<usize> = None;

    for (byte, ch) in text.char_indices() {
        if ch == ' ' {
            run_start.get_or_insert(byte);
            continue;
        }
        if let Some(run) = run_start.take()
            && byte - run >= min_spaces
        {
            parts.push(&text[start..run]);
            start = byte;
        }
    }
    parts.push(&text[start..]);

    parts
        .into_iter()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect()
}

/// Splits a line into labels and the fill runs that follow them.
///
/// Text between fills is further split on wide spacing; only the last
/// piece before a fill owns it. A fill with no text before it yields a
/// segment with an empty label.
pub(crate) fn split_segments(patterns: &PatternSet, text: &str, min_spaces: usize) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0usize;

    for fill in patterns.find_fills(text) {
        let before = &text[cursor..fill.byte_start];
        let mut pieces = split_on_spacing(before, min_spaces);
        let owner = pieces.pop();
        segments.extend(pieces.into_iter().map(|piece| Segment {
            label: clean_label(piece),
            fill: None,
        }));
        segments.push(Segment {
            label: owner.map(clean_label).unwrap_or_default(),
            fill: Some(fill),
        });
        cursor = fill.byte_end;
    }

    segments.extend(
        split_on_spacing(&text[cursor..], min_spaces)
            .into_iter()
            .map(|piece| Segment {
                label: clean_label(piece),
                fill: None,
            }),
    );

    segments.retain(|segment| !segment.label.is_empty() || segment.fill.is_some());
    segments
}

/// Returns `true` when the text has at least one word of two letters.
pub(crate) fn has_label_token(text: &str) -> bool {
    text.split(|c: char| !c.is_alphabetic())
        .any(|word| word.chars().count() >= 2)
}

/// Returns `true` when every letter is uppercase and there are at least
/// `min_letters` of them.
pub(crate) fn is_all_caps(text: &str, min_letters: usize) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= min_letters && letters.iter().all(|c| c.is_uppercase())
}

pub(crate) fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Heuristic for explanatory prose that carries no field.
///
/// Questions and prompts (ending in `?` or `:`) are never descriptive.
pub(crate) fn is_descriptive(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.ends_with('?') || trimmed.ends_with(':') {
        return false;
    }
    if trimmed
        .chars()
        .find(|c| c.is_alphabetic())
        .is_some_and(|c| c.is_lowercase())
    {
        return true;
    }

    let words = word_count(trimmed);
    let normalized = normalize_label(trimmed);
    let has_pronoun = normalized
        .split_whitespace()
        .any(|word| PRONOUNS.contains(&word));
    if words > LONG_LINE_WORDS && has_pronoun {
        return true;
    }
    if sentence_breaks(trimmed) > 0 {
        return true;
    }
    words >= SENTENCE_WORDS && trimmed.ends_with('.')
}

fn sentence_breaks(text: &str) -> usize {
    let chars: Vec<char> = text.chars().collect();
    chars
        .windows(3)
        .filter(|w| matches!(w[0], '.' | '!' | '?') && w[1] == ' ' && w[2].is_uppercase())
        .count()
}

/// Picks the field type and control for a labelled blank.
pub(crate) fn refine_type(patterns: &PatternSet, label: &str, fill_text: &str) -> (FieldType, Control) {
    if patterns.ends_with_date_keyword(label) {
        return (FieldType::Date, Control::default());
    }
    if patterns.has_signature_keyword(label) {
        return (FieldType::Signature, Control::default());
    }
    if patterns.has_date_keyword(label)
        || patterns.looks_like_date_blank(label)
        || patterns.looks_like_date_blank(fill_text)
    {
        return (FieldType::Date, Control::default());
    }
    if normalize_label(label) == "state" {
        return (FieldType::States, Control::default());
    }
    (FieldType::Input, Control::input(input_kind(patterns, label)))
}

/// Infers the input subtype from label keywords.
pub(crate) fn input_kind(patterns: &PatternSet, label: &str) -> InputKind {
    if patterns.has_ssn_keyword(label) {
        InputKind::Ssn
    } else if patterns.has_email_keyword(label) {
        InputKind::Email
    } else if patterns.has_zip_keyword(label) {
        InputKind::Zip
    } else if patterns.has_phone_keyword(label) {
        InputKind::Phone
    } else if patterns.has_number_keyword(label) {
        InputKind::Number
    } else {
        InputKind::Text
    }
}
