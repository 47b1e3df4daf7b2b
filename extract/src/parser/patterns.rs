//! Compiled pattern tables.
//!
//! [`PatternSet`] is the compiled, immutable form of [`PatternConfig`]. It is
//! built once per extractor and shared by every rule, the grid parser and
//! the consolidator. Structural expressions that do not vary per form
//! (blank-fill runs, list bullets, inline choice syntax) are compiled here
//! too, so nothing is held in module-level state.

use std::collections::HashSet;

use regex::Regex;

use form_schema_core::{Section, normalize_label};

use crate::config::PatternConfig;
use crate::error::{ExtractError, Result};

const FILL_PATTERN: &str =
    r"_{2,}(?:\s*/\s*_{2,})+|_{3,}|-{3,}|\.{4,}|…{2,}|\(\s{2,}\)";
const DATE_BLANK_PATTERN: &str =
    r"(?i)_+\s*/\s*_+\s*/\s*_+|\b(?:mm|dd)\s*/\s*(?:dd|mm)\s*/\s*(?:yy|yyyy)\b";
const UNDERLINE_PATTERN: &str = r"^\s*[=\-_~]{3,}\s*$";
const LIST_ITEM_PATTERN: &str = r"(?i)^\s*(?:\(\s*(?:[ivxlc]{1,5}|\d{1,2}|[a-z])\s*\)|(?:\d{1,2}|[a-z]|[ivxlc]{1,5})[.)]|[•·▪◦‣*-])\s+\S";
const HEADING_NUMBER_PATTERN: &str = r"(?i)^(?:(?:section|part)\s+)?(?:\d{1,2}|[ivx]{1,4}|[a-h])[.):]\s+";
const WIDE_GAP_PATTERN: &str = r"\s{2,}";
const YES_NO_PATTERN: &str =
    r"(?i)\b(?:yes\s*(?:/|\bor\b|,)?\s*no|y\s*(?:/|\bor\b|,)\s*n)\b\s*\)?[\s_.]*$";
const EITHER_OR_PATTERN: &str = r"^(?P<label>.*?\S)\s*(?P<sep>[:?])\s*\(?(?P<a>[A-Z][\w'-]*|[A-Za-z]{1,2})\s+or\s+(?P<b>[A-Z][\w'-]*|[A-Za-z]{1,2})\)?[\s_.]*$";
const CHOOSE_PATTERN: &str = r"(?i)^(?P<label>.*?)\(?\s*\b(?:please\s+)?(?:circle|check|select|mark|choose)\s+(?P<scope>one|all\s+that\s+apply|any\s+that\s+apply|all|any)\b\s*\)?\s*[:\-]?\s*(?P<rest>.*)$";

const DATE_PARTS: &[&str] = &["mm", "dd", "yy", "yyyy", "month", "day", "year", "mo", "yr"];
const YES_NO_WORDS: &[&str] = &["yes", "no", "y", "n"];
const CONJUNCTIONS: &[&str] = &["and", "or"];

/// A checkbox glyph located on a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Marker {
    /// Character column of the first glyph character.
    pub start: usize,
    /// Character column just past the glyph.
    pub end: usize,
    pub byte_start: usize,
    pub byte_end: usize,
}

/// A run of blank-fill characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FillSpan {
    pub byte_start: usize,
    pub byte_end: usize,
    /// Width in characters.
    pub width: usize,
}

/// Compiled pattern tables shared by the detector, grid parser and
/// consolidator.
#[derive(Debug, Clone)]
pub struct PatternSet {
    headings: Vec<(Section, Regex)>,
    noise: Vec<Regex>,
    known_labels: HashSet<String>,
    abbreviations: HashSet<String>,
    date_keywords: Vec<String>,
    signature_keywords: Vec<String>,
    phone_keywords: Vec<String>,
    email_keywords: Vec<String>,
    ssn_keywords: Vec<String>,
    zip_keywords: Vec<String>,
    number_keywords: Vec<String>,
    condition_intros: Vec<Regex>,
    consent_openers: Vec<Regex>,
    explanation: Regex,
    condition_keywords: HashSet<String>,
    section_keywords: Vec<(Section, Vec<String>)>,
    markers: Vec<String>,
    pub(crate) fill: Regex,
    pub(crate) date_blank: Regex,
    pub(crate) underline: Regex,
    pub(crate) list_item: Regex,
    pub(crate) heading_number: Regex,
    pub(crate) wide_gap: Regex,
    pub(crate) yes_no: Regex,
    pub(crate) either_or: Regex,
    pub(crate) choose: Regex,
}

fn compile(table: &'static str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| ExtractError::InvalidPattern {
        table,
        pattern: pattern.to_string(),
        source,
    })
}

fn compile_all(table: &'static str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns.iter().map(|p| compile(table, p)).collect()
}

fn normalized_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|item| normalize_label(item))
        .filter(|item| !item.is_empty())
        .collect()
}

impl PatternSet {
    /// Compiles every table in `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidPattern`] naming the table and the
    /// offending expression when a regex fails to compile.
    pub fn new(config: &PatternConfig) -> Result<Self> {
        let mut headings = Vec::new();
        for heading in &config.section_headings {
            for pattern in &heading.patterns {
                let anchored = format!(r"(?i)^(?:{pattern})$");
                headings.push((heading.section, compile("section_headings", &anchored)?));
            }
        }

        let mut markers: Vec<String> = config
            .checkbox_markers
            .iter()
            .filter(|m| !m.trim().is_empty())
            .cloned()
            .collect();
        // Longest first so "[x]" wins over a bare "[" prefix of another glyph.
        markers.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()).then(a.cmp(b)));
        markers.dedup();

        Ok(Self {
            headings,
            noise: compile_all("noise_patterns", &config.noise_patterns)?,
            known_labels: normalized_list(&config.known_labels).into_iter().collect(),
            abbreviations: normalized_list(&config.abbreviations).into_iter().collect(),
            date_keywords: normalized_list(&config.date_keywords),
            signature_keywords: normalized_list(&config.signature_keywords),
            phone_keywords: normalized_list(&config.phone_keywords),
            email_keywords: normalized_list(&config.email_keywords),
            ssn_keywords: normalized_list(&config.ssn_keywords),
            zip_keywords: normalized_list(&config.zip_keywords),
            number_keywords: normalized_list(&config.number_keywords),
            condition_intros: compile_all("condition_intros", &config.condition_intros)?,
            consent_openers: compile_all("consent_openers", &config.consent_openers)?,
            explanation: compile("explanation_pattern", &config.explanation_pattern)?,
            condition_keywords: normalized_list(&config.condition_keywords)
                .into_iter()
                .collect(),
            section_keywords: config
                .section_keywords
                .iter()
                .map(|entry| (entry.section, normalized_list(&entry.keywords)))
                .collect(),
            markers,
            fill: compile("fill", FILL_PATTERN)?,
            date_blank: compile("date_blank", DATE_BLANK_PATTERN)?,
            underline: compile("underline", UNDERLINE_PATTERN)?,
            list_item: compile("list_item", LIST_ITEM_PATTERN)?,
            heading_number: compile("heading_number", HEADING_NUMBER_PATTERN)?,
            wide_gap: compile("wide_gap", WIDE_GAP_PATTERN)?,
            yes_no: compile("yes_no", YES_NO_PATTERN)?,
            either_or: compile("either_or", EITHER_OR_PATTERN)?,
            choose: compile("choose", CHOOSE_PATTERN)?,
        })
    }

    /// Returns the section whose heading dictionary matches `heading`.
    pub(crate) fn heading_section(&self, heading: &str) -> Option<Section> {
        self.headings
            .iter()
            .find(|(_, re)| re.is_match(heading))
            .map(|(section, _)| *section)
    }

    pub(crate) fn is_noise(&self, text: &str) -> bool {
        self.noise.iter().any(|re| re.is_match(text))
    }

    pub(crate) fn is_known_label(&self, label: &str) -> bool {
        let normalized = normalize_label(label);
        !normalized.is_empty() && self.known_labels.contains(&normalized)
    }

    pub(crate) fn is_abbreviation(&self, token: &str) -> bool {
        self.abbreviations.contains(&normalize_label(token))
    }

    pub(crate) fn is_condition_intro(&self, text: &str) -> bool {
        self.condition_intros.iter().any(|re| re.is_match(text))
    }

    pub(crate) fn is_consent_opener(&self, text: &str) -> bool {
        self.consent_openers.iter().any(|re| re.is_match(text))
    }

    /// Byte offset where an "if yes, explain" clause starts.
    pub(crate) fn explanation_start(&self, text: &str) -> Option<usize> {
        self.explanation.find(text).map(|m| m.start())
    }

    pub(crate) fn has_date_keyword(&self, text: &str) -> bool {
        contains_any(text, &self.date_keywords)
    }

    pub(crate) fn ends_with_date_keyword(&self, text: &str) -> bool {
        let normalized = normalize_label(text);
        normalized
            .split_whitespace()
            .last()
            .is_some_and(|last| self.date_keywords.iter().any(|k| k == last))
    }

    pub(crate) fn has_signature_keyword(&self, text: &str) -> bool {
        contains_any(text, &self.signature_keywords)
    }

    pub(crate) fn has_phone_keyword(&self, text: &str) -> bool {
        contains_any(text, &self.phone_keywords)
    }

    pub(crate) fn has_email_keyword(&self, text: &str) -> bool {
        contains_any(text, &self.email_keywords)
    }

    pub(crate) fn has_ssn_keyword(&self, text: &str) -> bool {
        contains_any(text, &self.ssn_keywords)
    }

    pub(crate) fn has_zip_keyword(&self, text: &str) -> bool {
        contains_any(text, &self.zip_keywords)
    }

    pub(crate) fn has_number_keyword(&self, text: &str) -> bool {
        contains_any(text, &self.number_keywords)
    }

    /// Returns `true` when any word of `text` is a condition keyword.
    pub(crate) fn has_condition_keyword(&self, text: &str) -> bool {
        normalize_label(text)
            .split_whitespace()
            .any(|word| self.condition_keywords.contains(word))
    }

    /// Per-section count of distinct keywords present in `text`.
    pub(crate) fn section_hits(&self, text: &str) -> Vec<(Section, usize)> {
        let padded = format!(" {} ", normalize_label(text));
        self.section_keywords
            .iter()
            .map(|(section, keywords)| {
                let hits = keywords
                    .iter()
                    .filter(|k| padded.contains(&format!(" {k} ")))
                    .count();
                (*section, hits)
            })
            .collect()
    }

    /// Section with the most keyword hits, when it reaches `min_hits` and
    /// no other section ties it.
    pub(crate) fn infer_section(&self, text: &str, min_hits: usize) -> Option<Section> {
        let hits = self.section_hits(text);
        let best = hits.iter().map(|(_, count)| *count).max()?;
        if best < min_hits {
            return None;
        }
        let mut winners = hits.iter().filter(|(_, count)| *count == best);
        let (section, _) = winners.next()?;
        if winners.next().is_some() {
            return None;
        }
        Some(*section)
    }

    /// Locates checkbox glyphs, including bracket boxes with inner spacing.
    pub(crate) fn find_markers(&self, text: &str) -> Vec<Marker> {
        let mut found = Vec::new();
        let mut column = 0usize;
        let mut byte = 0usize;

        while byte < text.len() {
            let rest = &text[byte..];
            let glyph_len = bracket_box_len(rest).or_else(|| {
                self.markers
                    .iter()
                    .find(|m| rest.starts_with(m.as_str()))
                    .map(|m| m.len())
            });
            if let Some(len) = glyph_len {
                let width = rest[..len].chars().count();
                found.push(Marker {
                    start: column,
                    end: column + width,
                    byte_start: byte,
                    byte_end: byte + len,
                });
                column += width;
                byte += len;
                continue;
            }
            let Some(ch) = rest.chars().next() else {
                break;
            };
            column += 1;
            byte += ch.len_utf8();
        }

        found
    }

    /// Locates blank-fill runs, merging runs separated only by spacing or
    /// phone/date punctuation.
    pub(crate) fn find_fills(&self, text: &str) -> Vec<FillSpan> {
        let mut spans: Vec<FillSpan> = Vec::new();
        for m in self.fill.find_iter(text) {
            if let Some(last) = spans.last_mut() {
                let gap = &text[last.byte_end..m.start()];
                if gap
                    .chars()
                    .all(|c| c.is_whitespace() || matches!(c, '(' | ')' | '/' | '-' | '.'))
                {
                    last.byte_end = m.end();
                    last.width = text[last.byte_start..last.byte_end].chars().count();
                    continue;
                }
            }
            spans.push(FillSpan {
                byte_start: m.start(),
                byte_end: m.end(),
                width: m.as_str().chars().count(),
            });
        }
        spans
    }

    pub(crate) fn has_fill(&self, text: &str) -> bool {
        self.fill.is_match(text)
    }

    pub(crate) fn looks_like_date_blank(&self, text: &str) -> bool {
        self.date_blank.is_match(text)
    }

    /// Splits on runs of two or more spaces, returning trimmed parts with
    /// their starting character column.
    pub(crate) fn wide_parts<'t>(&self, text: &'t str) -> Vec<(usize, &'t str)> {
        let mut parts = Vec::new();
        let mut cursor = 0usize;
        let push = move |parts: &mut Vec<(usize, &'t str)>, from: usize, to: usize| {
            let piece = &text[from..to];
            let trimmed = piece.trim();
            if !trimmed.is_empty() {
                let lead = piece.len() - piece.trim_start().len();
                let column = text[..from + lead].chars().count();
                parts.push((column, trimmed));
            }
        };
        for gap in self.wide_gap.find_iter(text) {
            push(&mut parts, cursor, gap.start());
            cursor = gap.end();
        }
        push(&mut parts, cursor, text.len());
        parts
    }
}

fn contains_any(text: &str, keywords: &[String]) -> bool {
    let padded = format!(" {} ", normalize_label(text));
    keywords.iter().any(|k| padded.contains(&format!(" {k} ")))
}

/// Byte length of a `[ ]`, `[x]` or `[   ]` box at the start of `rest`.
fn bracket_box_len(rest: &str) -> Option<usize> {
    let inner = rest.strip_prefix('[')?;
    let mut len = 1;
    let mut spaces = 0;
    let mut tick = false;
    for ch in inner.chars() {
        match ch {
            ']' => return Some(len + 1),
            ' ' if spaces < 4 => spaces += 1,
            'x' | 'X' | '✓' | '✔' if !tick => tick = true,
            _ => return None,
        }
        len += ch.len_utf8();
    }
    None
}

/// Returns `true` for bare yes/no answers.
pub(crate) fn is_yes_no(text: &str) -> bool {
    YES_NO_WORDS.contains(&normalize_label(text).as_str())
}

pub(crate) fn is_yes(text: &str) -> bool {
    matches!(normalize_label(text).as_str(), "yes" | "y")
}

pub(crate) fn is_date_part(text: &str) -> bool {
    DATE_PARTS.contains(&normalize_label(text).as_str())
}

pub(crate) fn is_conjunction(text: &str) -> bool {
    CONJUNCTIONS.contains(&normalize_label(text).as_str())
}
