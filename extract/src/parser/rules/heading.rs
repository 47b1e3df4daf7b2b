//! Section headings.

use form_schema_core::Section;

use super::{LineRule, RuleContext, RuleOutcome};
use crate::parser::IndexedLine;
use crate::parser::classify::{has_label_token, is_all_caps, word_count};
use crate::parser::patterns::PatternSet;

const MAX_HEADING_WORDS: usize = 6;
const MIN_CAPS_LETTERS: usize = 4;

pub(crate) struct HeadingRule;

impl LineRule for HeadingRule {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome> {
        detect(ctx.patterns, &line.text, ctx.next_line(), false)
            .map(|(section, consumed)| RuleOutcome::Section { section, consumed })
    }
}

/// Strips numbering, decoration and a trailing colon from a heading line.
pub(crate) fn heading_text(patterns: &PatternSet, text: &str) -> String {
    let trimmed = text.trim();
    let unnumbered = patterns.heading_number.replace(trimmed, "");
    let stripped = unnumbered.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, '*' | '#' | '=' | '-' | '_' | '~' | ':' | '.')
    });
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Recognizes a heading line.
///
/// Returns the section it switches to (`None` keeps the current one) and
/// how many lines it spans. With `strict` set only dictionary headings and
/// underlined titles count; bare all-caps lines do not.
pub(crate) fn detect(
    patterns: &PatternSet,
    text: &str,
    next: Option<&IndexedLine>,
    strict: bool,
) -> Option<(Option<Section>, usize)> {
    let trimmed = text.trim();
    if trimmed.is_empty()
        || !patterns.find_markers(trimmed).is_empty()
        || patterns.has_fill(trimmed)
    {
        return None;
    }

    let heading = heading_text(patterns, trimmed);
    if !has_label_token(&heading) {
        return None;
    }
    let words = word_count(&heading);

    let underlined = words <= MAX_HEADING_WORDS
        && !trimmed.ends_with('?')
        && next.is_some_and(|line| patterns.underline.is_match(&line.text));
    let consumed = if underlined { 2 } else { 1 };

    if let Some(section) = patterns.heading_section(&heading) {
        return Some((Some(section), consumed));
    }
    if underlined {
        return Some((patterns.infer_section(&heading, 1), consumed));
    }
    if strict
        || trimmed.ends_with('?')
        || patterns.wide_parts(trimmed).len() > 1
        || patterns.is_noise(trimmed)
    {
        return None;
    }

    if is_all_caps(&heading, MIN_CAPS_LETTERS) && words <= MAX_HEADING_WORDS {
        let inferred = patterns.infer_section(&heading, 1);
        if words >= 2 || inferred.is_some() {
            return Some((inferred, 1));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::rules::testing::Fixture;

    fn outcome(lines: &[&str]) -> Option<(Option<Section>, usize)> {
        let fixture = Fixture::new(lines);
        match fixture.apply(&HeadingRule, 0) {
            Some(RuleOutcome::Section { section, consumed }) => Some((section, consumed)),
            _ => None,
        }
    }

    #[test]
    fn test_dictionary_heading() {
        assert_eq!(
            outcome(&["MEDICAL HISTORY:"]),
            Some((Some(Section::MedicalHistory), 1))
        );
        assert_eq!(
            outcome(&["2. Dental History"]),
            Some((Some(Section::DentalHistory), 1))
        );
        assert_eq!(
            outcome(&["*** Insurance Information ***"]),
            Some((Some(Section::Insurance), 1))
        );
    }

    #[test]
    fn test_underlined_heading_consumes_rule_line() {
        assert_eq!(
            outcome(&["Emergency Contact", "-----------------"]),
            Some((Some(Section::EmergencyContact), 2))
        );
    }

    #[test]
    fn test_all_caps_heading_infers_section() {
        assert_eq!(
            outcome(&["PATIENT NAME AND ADDRESS"]),
            Some((Some(Section::PatientInformation), 1))
        );
        assert_eq!(outcome(&["OFFICE NOTES"]), Some((None, 1)));
    }

    #[test]
    fn test_non_headings() {
        assert_eq!(outcome(&["Name: ________"]), None);
        assert_eq!(outcome(&["DO YOU SMOKE?"]), None);
        assert_eq!(outcome(&["Patient Name"]), None);
        assert_eq!(outcome(&["NAME    DATE    TIME"]), None);
    }

    #[test]
    fn test_strict_mode_ignores_bare_caps() {
        let fixture = Fixture::new(&["HIGH BLOOD PRESSURE"]);
        assert!(detect(&fixture.patterns, &fixture.lines[0].text, None, true).is_none());
        assert!(detect(&fixture.patterns, &fixture.lines[0].text, None, false).is_some());
        assert!(detect(&fixture.patterns, "Dental History", None, true).is_some());
    }
}
