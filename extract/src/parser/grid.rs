//! Multi-column checkbox grids and condition lists.
//!
//! A grid is a block of rows whose checkbox markers line up in columns,
//! optionally topped by a header line naming each column's category.
//! Columns are inferred by clustering marker offsets; a block that does not
//! yield enough columns is reported as ambiguous and the detector falls
//! back to reading it row by row.

use std::collections::HashSet;

use tracing::debug;

use form_schema_core::{Control, Field, FieldType, Section, derive_key, normalize_label, slugify};

use super::IndexedLine;
use super::ast::{FieldCandidate, SourceSpan};
use super::classify::{clean_label, dedupe_repeated_words, has_label_token, word_count};
use super::confidence::{CONDITION_BLOCK_CONFIDENCE, GRID_CONFIDENCE};
use super::patterns::{Marker, PatternSet, is_yes, is_yes_no};
use super::rules::RuleContext;
use super::state::CollectBlock;
use crate::config::{EmissionMode, ExtractConfig};

pub(crate) const DEFAULT_GRID_TITLE: &str = "Please mark any that apply";
const DEFAULT_CONDITIONS_TITLE: &str = "Do you have any of the following?";
const MAX_HEADER_WORDS: usize = 4;
const MAX_HEADER_CHARS: usize = 32;
const MAX_CONDITION_WORDS: usize = 5;

/// Where a grid block starts, as found by [`probe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct GridStart {
    /// Position of the category header line, if one precedes the rows.
    pub header: Option<usize>,
    pub first_row: usize,
    /// Lines consumed by the trigger (header plus first row, or one row).
    pub consumed: usize,
    /// The preceding prompt becomes the grid intro.
    pub absorb_prompt: bool,
}

impl GridStart {
    /// Opens a collect block for this start.
    pub(crate) fn block(&self, section: Section) -> CollectBlock {
        let block = CollectBlock::new(section).with_row(self.first_row);
        match self.header {
            Some(header) => block.with_header(header),
            None => block,
        }
    }
}

/// Result of parsing a collected grid block.
#[derive(Debug)]
pub(crate) enum GridOutcome {
    Parsed(Vec<FieldCandidate>),
    /// Too few columns or no usable options.
    Ambiguous,
}

/// Returns `true` when a header part at `column` lines up with a marker or
/// column center at `target`.
fn aligns(column: usize, part: &str, target: usize, tolerance: usize) -> bool {
    column.abs_diff(target) <= tolerance
        || (target >= column && target < column + part.chars().count())
}

fn is_header_phrase(part: &str) -> bool {
    let words = word_count(part);
    words >= 1
        && words <= MAX_HEADER_WORDS
        && part.chars().count() <= MAX_HEADER_CHARS
        && !part.ends_with('?')
        && !part.ends_with(':')
        && part.chars().next().is_some_and(char::is_uppercase)
}

fn ends_label(text: &str, first: &Marker) -> bool {
    let prefix = text[..first.byte_start].trim();
    prefix.ends_with(':') || prefix.ends_with('?')
}

/// Markers of the consecutive unlabelled checkbox rows starting at `from`,
/// at most `grid_max_rows` of them.
fn marker_window(ctx: &RuleContext<'_>, from: usize) -> Vec<Vec<Marker>> {
    ctx.lines
        .iter()
        .skip(from)
        .take(ctx.config.grid_max_rows)
        .map(|line| (line, ctx.patterns.find_markers(&line.text)))
        .take_while(|(line, markers)| markers.first().is_some_and(|first| !ends_label(&line.text, first)))
        .map(|(_, markers)| markers)
        .collect()
}

/// Checks whether the current line starts a grid.
///
/// Either a header line of at least `grid_min_columns` short phrases sits
/// above rows whose markers line up with them, or the line itself has
/// that many markers and the checkbox rows from here on cluster into at
/// least that many columns. Later rows may be sparse.
pub(crate) fn probe(ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<GridStart> {
    let patterns = ctx.patterns;
    let config = ctx.config;
    let tolerance = config.grid_column_tolerance;
    let next = ctx.next_line()?;
    let next_markers = patterns.find_markers(&next.text);
    let markers = patterns.find_markers(&line.text);

    if markers.is_empty() {
        if patterns.has_fill(&line.text) || next_markers.is_empty() {
            return None;
        }
        let parts = patterns.wide_parts(&line.text);
        if parts.len() < config.grid_min_columns || !parts.iter().all(|(_, part)| is_header_phrase(part)) {
            return None;
        }
        let window = marker_window(ctx, ctx.position + 1);
        let aligned = parts
            .iter()
            .filter(|(column, part)| {
                window
                    .iter()
                    .flatten()
                    .any(|m| aligns(*column, part, m.start, tolerance))
            })
            .count();
        if aligned < config.grid_min_columns {
            return None;
        }
        return Some(GridStart {
            header: Some(ctx.position),
            first_row: ctx.position + 1,
            consumed: 2,
            absorb_prompt: ctx.prompt.is_some(),
        });
    }

    if markers.len() < config.grid_min_columns || next_markers.is_empty() {
        return None;
    }
    if ends_label(&line.text, &markers[0]) || ends_label(&next.text, &next_markers[0]) {
        return None;
    }
    let aligned = markers
        .iter()
        .filter(|m| {
            next_markers
                .iter()
                .any(|n| m.start.abs_diff(n.start) <= tolerance)
        })
        .count();
    if aligned < config.grid_min_columns
        && infer_columns(&marker_window(ctx, ctx.position), tolerance).len() < config.grid_min_columns
    {
        return None;
    }
    Some(GridStart {
        header: None,
        first_row: ctx.position,
        consumed: 1,
        absorb_prompt: ctx.prompt.is_some(),
    })
}

#[derive(Debug)]
struct Cluster {
    sum: usize,
    count: usize,
    rows: HashSet<usize>,
}

impl Cluster {
    fn new(start: usize, row: usize) -> Self {
        Self {
            sum: start,
            count: 1,
            rows: HashSet::from([row]),
        }
    }

    fn center(&self) -> usize {
        self.sum / self.count
    }

    fn add(&mut self, start: usize, row: usize) {
        self.sum += start;
        self.count += 1;
        self.rows.insert(row);
    }
}

/// Infers column centers from per-row marker offsets.
///
/// Greedy nearest-center clustering within `tolerance`, at most one
/// marker per row per cluster. Only clusters seen on two or more rows
/// become columns. Centers are returned sorted.
pub(crate) fn infer_columns(rows: &[Vec<Marker>], tolerance: usize) -> Vec<usize> {
    let mut clusters: Vec<Cluster> = Vec::new();

    for (row, markers) in rows.iter().enumerate() {
        let mut used: Vec<usize> = Vec::new();
        for marker in markers {
            let best = clusters
                .iter()
                .enumerate()
                .filter(|(index, _)| !used.contains(index))
                .map(|(index, cluster)| (index, cluster.center().abs_diff(marker.start)))
                .filter(|(_, distance)| *distance <= tolerance)
                .min_by_key(|(_, distance)| *distance);
            match best {
                Some((index, _)) => {
                    clusters[index].add(marker.start, row);
                    used.push(index);
                }
                None => {
                    clusters.push(Cluster::new(marker.start, row));
                    used.push(clusters.len() - 1);
                }
            }
        }
    }

    let mut columns: Vec<usize> = clusters
        .iter()
        .filter(|cluster| cluster.rows.len() >= 2)
        .map(Cluster::center)
        .collect();
    columns.sort_unstable();
    columns.dedup();
    columns
}

fn nearest_column(columns: &[usize], start: usize) -> usize {
    columns
        .iter()
        .enumerate()
        .min_by_key(|(_, center)| center.abs_diff(start))
        .map_or(0, |(index, _)| index)
}

/// Matches header parts to columns one to one, in order.
fn match_headers(
    patterns: &PatternSet,
    text: &str,
    columns: &[usize],
    tolerance: usize,
) -> Option<Vec<String>> {
    let parts = patterns.wide_parts(text);
    if parts.len() != columns.len() {
        return None;
    }
    parts
        .iter()
        .zip(columns)
        .map(|((column, part), center)| {
            aligns(*column, part, *center, tolerance).then(|| clean_label(part))
        })
        .collect()
}

/// Option labels of one row, paired with the marker they follow.
///
/// Yes/no pairs collapse to the row prefix: the "yes" marker takes the
/// prefix as its label and the "no" marker is dropped.
fn row_options(text: &str, markers: &[Marker]) -> Vec<(Marker, String)> {
    let Some(first) = markers.first() else {
        return Vec::new();
    };
    let prefix = clean_label(&text[..first.byte_start]);

    markers
        .iter()
        .enumerate()
        .filter_map(|(i, marker)| {
            let end = markers.get(i + 1).map_or(text.len(), |next| next.byte_start);
            let label = dedupe_repeated_words(&clean_label(&text[marker.byte_end..end]));
            let label = if is_yes_no(&label) {
                if is_yes(&label) && has_label_token(&prefix) {
                    prefix.clone()
                } else {
                    return None;
                }
            } else {
                label
            };
            has_label_token(&label).then_some((*marker, label))
        })
        .collect()
}

fn block_span(lines: &[IndexedLine], positions: &[usize]) -> SourceSpan {
    match (positions.first(), positions.last()) {
        (Some(first), Some(last)) => SourceSpan::new(lines[*first].index, lines[*last].index),
        _ => SourceSpan::unknown(),
    }
}

fn multi_select(key: &str, title: &str, options: &[String], section: Section, confidence: f64) -> Field {
    Field::new(key, title, FieldType::Dropdown)
        .with_section(section)
        .with_control(Control::choice(options, true))
        .with_confidence(confidence)
}

/// Parses a collected grid block into multi-select fields.
pub(crate) fn parse_grid(
    lines: &[IndexedLine],
    block: &CollectBlock,
    config: &ExtractConfig,
    patterns: &PatternSet,
) -> GridOutcome {
    let tolerance = config.grid_column_tolerance;
    let rows: Vec<Vec<Marker>> = block
        .rows
        .iter()
        .map(|position| patterns.find_markers(&lines[*position].text))
        .collect();

    let columns = infer_columns(&rows, tolerance);
    if columns.len() < config.grid_min_columns {
        debug!(
            rows = block.rows.len(),
            columns = columns.len(),
            "grid block has too few aligned columns"
        );
        return GridOutcome::Ambiguous;
    }

    // Row-major reading order; the first occurrence of an option wins.
    let mut seen: HashSet<String> = HashSet::new();
    let mut options: Vec<(usize, String)> = Vec::new();
    for (position, markers) in block.rows.iter().zip(&rows) {
        for (marker, label) in row_options(&lines[*position].text, markers) {
            if seen.insert(normalize_label(&label)) {
                options.push((nearest_column(&columns, marker.start), label));
            }
        }
    }
    if options.is_empty() {
        return GridOutcome::Ambiguous;
    }

    let headers = block
        .header
        .and_then(|header| match_headers(patterns, &lines[header].text, &columns, tolerance));
    let span = block_span(lines, &block.positions());
    let intro = block
        .intro
        .clone()
        .unwrap_or_else(|| DEFAULT_GRID_TITLE.to_string());

    let fields: Vec<Field> = match (headers, config.category_header_emission_mode) {
        (Some(headers), EmissionMode::PerCategoryField) => headers
            .iter()
            .enumerate()
            .filter_map(|(column, category)| {
                let names: Vec<String> = options
                    .iter()
                    .filter(|(c, _)| *c == column)
                    .map(|(_, name)| name.clone())
                    .collect();
                if names.is_empty() {
                    return None;
                }
                let title = format!("{category} - please mark any that apply");
                Some(multi_select(&slugify(category), &title, &names, block.section, GRID_CONFIDENCE))
            })
            .collect(),
        (Some(headers), EmissionMode::PrefixedSingleField) => {
            let names: Vec<String> = headers
                .iter()
                .enumerate()
                .flat_map(|(column, category)| {
                    options
                        .iter()
                        .filter(move |(c, _)| *c == column)
                        .map(move |(_, name)| format!("{category} - {name}"))
                })
                .collect();
            vec![multi_select(&derive_key(&intro), &intro, &names, block.section, GRID_CONFIDENCE)]
        }
        (None, _) => {
            let names: Vec<String> = options.into_iter().map(|(_, name)| name).collect();
            vec![multi_select(&derive_key(&intro), &intro, &names, block.section, GRID_CONFIDENCE)]
        }
    };

    debug!(
        fields = fields.len(),
        columns = columns.len(),
        "parsed checkbox grid"
    );
    GridOutcome::Parsed(
        fields
            .into_iter()
            .map(|field| FieldCandidate::new(field, span, "grid").grid_derived())
            .collect(),
    )
}

/// Returns `true` for a marker-less line listing conditions.
pub(crate) fn is_condition_phrase_row(patterns: &PatternSet, text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.ends_with('?') || trimmed.ends_with(':') || patterns.has_fill(trimmed) {
        return false;
    }
    let parts = patterns.wide_parts(trimmed);
    if parts
        .iter()
        .any(|(_, part)| word_count(part) > MAX_CONDITION_WORDS)
    {
        return false;
    }
    parts.len() >= 2 || patterns.has_condition_keyword(trimmed)
}

/// Builds the multi-select field for a condition list.
pub(crate) fn parse_conditions(
    lines: &[IndexedLine],
    block: &CollectBlock,
    patterns: &PatternSet,
) -> FieldCandidate {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names: Vec<String> = Vec::new();

    for position in &block.rows {
        let text = &lines[*position].text;
        let markers = patterns.find_markers(text);
        let labels: Vec<String> = if markers.is_empty() {
            patterns
                .wide_parts(text)
                .into_iter()
                .map(|(_, part)| dedupe_repeated_words(&clean_label(part)))
                .filter(|label| !is_yes_no(label))
                .collect()
        } else {
            row_options(text, &markers)
                .into_iter()
                .map(|(_, label)| label)
                .collect()
        };
        for label in labels {
            if has_label_token(&label) && seen.insert(normalize_label(&label)) {
                names.push(label);
            }
        }
    }

    let key = if block.section == Section::DentalHistory {
        "dental_conditions"
    } else {
        "medical_conditions"
    };
    let title = block
        .intro
        .clone()
        .unwrap_or_else(|| DEFAULT_CONDITIONS_TITLE.to_string());
    let field = multi_select(key, &title, &names, block.section, CONDITION_BLOCK_CONFIDENCE);
    let rows_span = block_span(lines, &block.rows);
    let span = match &block.intro_candidate {
        Some(intro) if !intro.source_span.is_unknown() && !rows_span.is_unknown() => {
            SourceSpan::new(intro.source_span.line_start, rows_span.line_end)
        }
        _ => rows_span,
    };
    FieldCandidate::new(field, span, "condition_block").grid_derived()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::normalize::normalize_lines;

    fn setup(lines: &[&str]) -> (ExtractConfig, PatternSet, Vec<IndexedLine>) {
        let config = ExtractConfig::default();
        let patterns = PatternSet::new(&config.patterns).unwrap();
        (config, patterns, normalize_lines(lines))
    }

    fn cells(cells: &[&str]) -> String {
        cells
            .iter()
            .map(|cell| format!("{cell:<20}"))
            .collect::<String>()
            .trim_end()
            .to_string()
    }

    fn marker(start: usize) -> Marker {
        Marker {
            start,
            end: start + 3,
            byte_start: start,
            byte_end: start + 3,
        }
    }

    #[test]
    fn test_infer_columns_requires_two_rows() {
        let rows = vec![
            vec![marker(0), marker(20), marker(40)],
            vec![marker(1), marker(21), marker(41), marker(70)],
        ];
        assert_eq!(infer_columns(&rows, 10), vec![0, 20, 40]);
    }

    #[test]
    fn test_infer_columns_keeps_close_markers_apart() {
        let rows = vec![vec![marker(0), marker(8)], vec![marker(0), marker(8)]];
        assert_eq!(infer_columns(&rows, 10), vec![0, 8]);
    }

    #[test]
    fn test_grid_per_category_fields() {
        let lines = vec![
            cells(&["Appearance", "Function", "Habits"]),
            cells(&["[ ] Whiter teeth", "[ ] Chewing", "[ ] Grinding"]),
            cells(&["[ ] Straighter", "[ ] Sensitivity", "[ ] Clenching"]),
        ];
        let (config, patterns, lines) = setup(&lines.iter().map(String::as_str).collect::<Vec<_>>());
        let block = CollectBlock::new(Section::DentalHistory)
            .with_header(0)
            .with_row(1)
            .with_row(2);

        let GridOutcome::Parsed(fields) = parse_grid(&lines, &block, &config, &patterns) else {
            panic!("expected parsed grid");
        };
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].field.key, "appearance");
        assert_eq!(fields[0].field.title, "Appearance - please mark any that apply");
        assert_eq!(
            fields[1].field.control.option_names(),
            vec!["Chewing", "Sensitivity"]
        );
        assert!(fields.iter().all(|c| c.grid_derived && c.field.control.multi == Some(true)));
        assert_eq!(fields[2].source_span, SourceSpan::new(0, 2));
    }

    #[test]
    fn test_grid_prefixed_single_field() {
        let lines = vec![
            cells(&["Appearance", "Function", "Habits"]),
            cells(&["[ ] Whiter teeth", "[ ] Chewing", "[ ] Grinding"]),
            cells(&["[ ] Straighter", "[ ] Sensitivity", "[ ] Clenching"]),
        ];
        let (mut config, patterns, lines) = setup(&lines.iter().map(String::as_str).collect::<Vec<_>>());
        config.category_header_emission_mode = EmissionMode::PrefixedSingleField;
        let block = CollectBlock::new(Section::DentalHistory)
            .with_intro("Would you like to change anything about your smile?")
            .with_header(0)
            .with_row(1)
            .with_row(2);

        let GridOutcome::Parsed(fields) = parse_grid(&lines, &block, &config, &patterns) else {
            panic!("expected parsed grid");
        };
        assert_eq!(fields.len(), 1);
        let names = fields[0].field.control.option_names();
        assert_eq!(names[0], "Appearance - Whiter teeth");
        assert_eq!(names[1], "Appearance - Straighter");
        assert_eq!(names[2], "Function - Chewing");
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn test_grid_dedupes_options() {
        let lines = vec![
            cells(&["[ ] Bleeding gums", "[ ] Bad breath", "[ ] Sensitivity"]),
            cells(&["[ ] Loose teeth", "[ ] Bleeding gums", "[ ] Clicking jaw"]),
        ];
        let (config, patterns, lines) = setup(&lines.iter().map(String::as_str).collect::<Vec<_>>());
        let block = CollectBlock::new(Section::DentalHistory).with_row(0).with_row(1);
        let GridOutcome::Parsed(fields) = parse_grid(&lines, &block, &config, &patterns) else {
            panic!("expected parsed grid");
        };
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field.title, DEFAULT_GRID_TITLE);
        assert_eq!(fields[0].field.control.options.len(), 5);
    }

    #[test]
    fn test_sparse_and_shifted_rows_join_nearest_column() {
        let lines = vec![
            cells(&["Appearance", "Function", "Habits"]),
            cells(&["[ ] Whiter teeth", "[ ] Chewing", "[ ] Grinding"]),
            cells(&["[ ] Straighter", "", "[ ] Clenching"]),
            cells(&["", "[ ] Sensitivity", ""]),
            format!("{}[ ] Nail biting", " ".repeat(52)),
        ];
        let (config, patterns, lines) = setup(&lines.iter().map(String::as_str).collect::<Vec<_>>());
        let block = CollectBlock::new(Section::DentalHistory)
            .with_header(0)
            .with_row(1)
            .with_row(2)
            .with_row(3)
            .with_row(4);

        let GridOutcome::Parsed(fields) = parse_grid(&lines, &block, &config, &patterns) else {
            panic!("expected parsed grid");
        };
        let names: Vec<Vec<&str>> = fields.iter().map(|c| c.field.control.option_names()).collect();
        assert_eq!(
            names,
            vec![
                vec!["Whiter teeth", "Straighter"],
                vec!["Chewing", "Sensitivity"],
                vec!["Grinding", "Clenching", "Nail biting"],
            ]
        );
    }

    #[test]
    fn test_nearest_column() {
        let columns = [0, 20, 40];
        assert_eq!(nearest_column(&columns, 3), 0);
        assert_eq!(nearest_column(&columns, 27), 1);
        assert_eq!(nearest_column(&columns, 52), 2);
        assert_eq!(nearest_column(&[], 5), 0);
    }

    #[test]
    fn test_misaligned_block_is_ambiguous() {
        let (config, patterns, lines) = setup(&[
            "[ ] One [ ] Two [ ] Three",
            "                                        [ ] Four",
        ]);
        let block = CollectBlock::new(Section::General).with_row(0).with_row(1);
        assert!(matches!(
            parse_grid(&lines, &block, &config, &patterns),
            GridOutcome::Ambiguous
        ));
    }

    #[test]
    fn test_yes_no_rows_use_prefix() {
        let markers_text = "Diabetes      [ ] Yes   [ ] No";
        let (_, patterns, _) = setup(&[]);
        let markers = patterns.find_markers(markers_text);
        let options = row_options(markers_text, &markers);
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].1, "Diabetes");
    }

    #[test]
    fn test_condition_list_field() {
        let (_, patterns, lines) = setup(&[
            "Heart disease      Diabetes      Asthma",
            "[ ] High blood pressure   [ ] Diabetes",
            "Hepatitis",
        ]);
        let block = CollectBlock::new(Section::MedicalHistory)
            .with_intro("Do you have any of the following?")
            .with_row(0)
            .with_row(1)
            .with_row(2);
        let candidate = parse_conditions(&lines, &block, &patterns);
        assert_eq!(candidate.field.key, "medical_conditions");
        assert_eq!(
            candidate.field.control.option_names(),
            vec!["Heart disease", "Diabetes", "Asthma", "High blood pressure", "Hepatitis"]
        );

        let dental = CollectBlock::new(Section::DentalHistory).with_row(2);
        assert_eq!(parse_conditions(&lines, &dental, &patterns).field.key, "dental_conditions");
    }

    #[test]
    fn test_condition_phrase_rows() {
        let (_, patterns, _) = setup(&[]);
        assert!(is_condition_phrase_row(&patterns, "Anemia      Arthritis"));
        assert!(is_condition_phrase_row(&patterns, "Kidney disease"));
        assert!(!is_condition_phrase_row(&patterns, "Are you allergic to penicillin?"));
        assert!(!is_condition_phrase_row(&patterns, "Physician name ________"));
        assert!(!is_condition_phrase_row(&patterns, "Thank you"));
    }
}
