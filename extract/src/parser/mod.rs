//! Form field detector and per-document extraction pipeline.
//!
//! [`FormExtractor`] owns the compiled configuration and runs the three
//! passes over one document's lines:
//!
//! 1. **Detection**: an ordered rule set classifies each line while a small
//!    mode machine ([`state::ParseMode`]) collects checkbox grids and
//!    condition lists into blocks.
//! 2. **Templating**: candidates are matched against the template catalog
//!    and normalized onto canonical keys.
//! 3. **Consolidation**: duplicates merge, keys are made unique and the
//!    field-list invariants are enforced.
//!
//! The extractor holds no per-document state, so one instance can serve
//! many documents concurrently.

pub mod ast;
pub(crate) mod classify;
pub mod confidence;
pub mod consolidate;
pub mod diagnostics;
pub(crate) mod grid;
pub mod normalize;
pub mod patterns;
pub(crate) mod rules;
pub mod state;
pub mod templating;

use tracing::debug;

use form_schema_catalog::{MatchConfig, TemplateCatalog, TemplateMatcher};
use form_schema_core::{Control, Field, FieldType, InputKind, Section, derive_key};

use self::ast::{FieldCandidate, SourceSpan};
use self::confidence::FALLBACK_CONFIDENCE;
use self::consolidate::{ConsolidationStats, consolidate};
use self::diagnostics::ParseDiagnostics;
use self::grid::GridOutcome;
use self::normalize::normalize_lines;
use self::patterns::PatternSet;
use self::rules::{DiscardReason, LineRule, RuleContext, RuleOutcome, default_rules, heading, noise};
use self::state::{BlockKind, CollectBlock, CollectLimits, ModeEvent, ParseMode};
use self::templating::{TemplatingStats, apply_templates};
use crate::config::ExtractConfig;
use crate::error::Result;

/// One normalized input line with its position in the caller's sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedLine {
    pub index: usize,
    pub text: String,
}

/// Candidates and diagnostics from the detection pass alone.
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub candidates: Vec<FieldCandidate>,
    pub diagnostics: ParseDiagnostics,
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone, Default)]
pub struct PipelineOutput {
    pub fields: Vec<Field>,
    pub diagnostics: ParseDiagnostics,
    pub templating: TemplatingStats,
    pub consolidation: ConsolidationStats,
}

/// Extracts structured fields from form text.
///
/// # Examples
///
/// ```
/// use form_schema_catalog::TemplateCatalog;
/// use form_schema_extract::{ExtractConfig, FormExtractor};
///
/// let extractor = FormExtractor::new(ExtractConfig::default()).unwrap();
/// let catalog = TemplateCatalog::builtin().unwrap();
/// let fields = extractor.extract(&["Gender: [ ] Male [ ] Female"], &catalog);
/// assert_eq!(fields[0].key, "gender");
/// ```
pub struct FormExtractor {
    config: ExtractConfig,
    patterns: PatternSet,
    match_config: MatchConfig,
    rules: Vec<Box<dyn LineRule>>,
}

impl std::fmt::Debug for FormExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormExtractor")
            .field("config", &self.config)
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl FormExtractor {
    /// Validates `config` and compiles its pattern tables.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::InvalidConfig`](crate::ExtractError::InvalidConfig)
    /// for out-of-range settings and
    /// [`ExtractError::InvalidPattern`](crate::ExtractError::InvalidPattern)
    /// for a regex that does not compile.
    pub fn new(config: ExtractConfig) -> Result<Self> {
        config.validate()?;
        let patterns = PatternSet::new(&config.patterns)?;
        let match_config = config.match_config();
        Ok(Self {
            config,
            patterns,
            match_config,
            rules: default_rules(),
        })
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Runs only the detection pass.
    pub fn detect(&self, lines: &[IndexedLine]) -> Detection {
        Scanner::new(self, lines).run()
    }

    /// Runs detection, templating and consolidation over normalized lines.
    pub fn run(&self, lines: &[IndexedLine], catalog: &TemplateCatalog) -> PipelineOutput {
        if lines.iter().all(|line| line.text.trim().is_empty()) {
            return PipelineOutput::default();
        }

        let Detection {
            mut candidates,
            diagnostics,
        } = self.detect(lines);
        let matcher = TemplateMatcher::new(catalog, &self.match_config);
        let templating = apply_templates(&mut candidates, &matcher, self.match_config.threshold);
        let (fields, consolidation) = consolidate(candidates, &self.config, &self.patterns);

        debug!(
            lines = lines.len(),
            fields = fields.len(),
            coverage = diagnostics.coverage(),
            "extracted document"
        );
        PipelineOutput {
            fields,
            diagnostics,
            templating,
            consolidation,
        }
    }

    /// Extracts the final field list from raw lines.
    ///
    /// Empty input yields an empty list.
    pub fn extract<S: AsRef<str>>(&self, lines: &[S], catalog: &TemplateCatalog) -> Vec<Field> {
        self.run(&normalize_lines(lines), catalog).fields
    }
}

/// Per-document detection state.
struct Scanner<'a> {
    extractor: &'a FormExtractor,
    lines: &'a [IndexedLine],
    section: Section,
    candidates: Vec<FieldCandidate>,
    diagnostics: ParseDiagnostics,
}

impl<'a> Scanner<'a> {
    fn new(extractor: &'a FormExtractor, lines: &'a [IndexedLine]) -> Self {
        Self {
            extractor,
            lines,
            section: Section::General,
            candidates: Vec::new(),
            diagnostics: ParseDiagnostics::default(),
        }
    }

    fn limits(&self) -> CollectLimits {
        let config = &self.extractor.config;
        CollectLimits {
            blank_run: config.collection_blank_run,
            idle_limit: config.collection_idle_limit,
            max_grid_rows: config.grid_max_rows,
        }
    }

    fn run(mut self) -> Detection {
        let limits = self.limits();
        let mut mode = ParseMode::Scanning;
        let mut position = 0;

        while position < self.lines.len() {
            let Some(kind) = mode.block_kind() else {
                let (consumed, opened) = self.scan_line(position, true);
                if let Some(event) = opened {
                    mode = mode.transition(event, limits).next;
                }
                position += consumed.max(1);
                continue;
            };

            let event = self.classify_collecting(kind, position);
            let transition = mode.transition(event, limits);
            mode = transition.next;
            if let Some((kind, block)) = transition.flushed {
                self.flush(kind, block);
            }
            if !transition.reprocess {
                position += 1;
            }
        }

        if let Some((kind, block)) = mode.transition(ModeEvent::EndOfInput, limits).flushed {
            self.flush(kind, block);
        }

        debug!(
            candidates = self.candidates.len(),
            relevant = self.diagnostics.relevant_lines,
            recognized = self.diagnostics.recognized_lines,
            "detection finished"
        );
        Detection {
            candidates: self.candidates,
            diagnostics: self.diagnostics,
        }
    }

    /// Runs the rule set over one line. Returns the number of lines consumed
    /// and a block-open event, if a rule started one.
    fn scan_line(&mut self, position: usize, grid_probe: bool) -> (usize, Option<ModeEvent>) {
        let lines = self.lines;
        let line = &lines[position];
        if line.text.trim().is_empty() {
            return (1, None);
        }

        let extractor = self.extractor;
        let found = {
            let previous = self.candidates.last();
            let prompt = previous
                .filter(|c| {
                    c.prompt && position > 0 && lines[position - 1].index == c.source_span.line_end
                })
                .map(|c| c.field.title.as_str());
            let ctx = RuleContext {
                config: &extractor.config,
                patterns: &extractor.patterns,
                section: self.section,
                lines,
                position,
                previous,
                prompt,
                grid_probe,
            };
            extractor
                .rules
                .iter()
                .find_map(|rule| rule.apply(&ctx, line).map(|outcome| (rule.name(), outcome)))
        };

        let Some((rule, outcome)) = found else {
            self.drop_line(line);
            return (1, None);
        };
        self.diagnostics.record_hit(rule);
        self.apply_outcome(line, outcome)
    }

    fn apply_outcome(&mut self, line: &IndexedLine, outcome: RuleOutcome) -> (usize, Option<ModeEvent>) {
        match outcome {
            RuleOutcome::Section { section, consumed } => {
                if let Some(section) = section {
                    debug!(line = line.index, section = %section, "section heading");
                    self.section = section;
                }
                self.count_recognized(1);
                self.diagnostics.noise_lines += consumed.saturating_sub(1);
                (consumed, None)
            }
            RuleOutcome::Discard(DiscardReason::Noise) => {
                self.diagnostics.noise_lines += 1;
                (1, None)
            }
            RuleOutcome::Discard(DiscardReason::Dropped) => {
                self.drop_line(line);
                (1, None)
            }
            RuleOutcome::AppendTerms {
                text,
                new_paragraph,
            } => {
                match self.candidates.iter_mut().rev().find(|c| c.is_terms()) {
                    Some(terms) => {
                        let body = terms.field.control.text.get_or_insert_with(String::new);
                        if !body.is_empty() {
                            body.push_str(if new_paragraph { "\n" } else { " " });
                        }
                        body.push_str(&text);
                        terms.source_span.line_end = line.index;
                        self.count_recognized(1);
                    }
                    None => self.drop_line(line),
                }
                (1, None)
            }
            RuleOutcome::Fields {
                fields,
                consumed,
                absorb_prompt,
            } => {
                if absorb_prompt {
                    self.take_prompt();
                }
                self.count_recognized(consumed);
                self.candidates.extend(fields);
                (consumed, None)
            }
            RuleOutcome::StartGrid(start) => {
                let mut block = start.block(self.section);
                if start.absorb_prompt
                    && let Some(prompt) = self.take_prompt()
                {
                    block.intro = Some(prompt.field.title.clone());
                    block.intro_candidate = Some(prompt);
                }
                (start.consumed, Some(ModeEvent::Open(BlockKind::Grid, block)))
            }
            RuleOutcome::StartConditions { intro } => {
                let field = Field::new(&derive_key(&intro), &intro, FieldType::Input)
                    .with_section(self.section)
                    .with_control(Control::input(InputKind::Text))
                    .with_confidence(FALLBACK_CONFIDENCE);
                let mut intro_candidate =
                    FieldCandidate::new(field, SourceSpan::single(line.index), "condition_intro");
                intro_candidate.prompt = true;

                let mut block = CollectBlock::new(self.section).with_intro(intro);
                block.intro_candidate = Some(intro_candidate);
                self.count_recognized(1);
                (1, Some(ModeEvent::Open(BlockKind::Conditions, block)))
            }
        }
    }

    /// Classifies a line while a block is open.
    fn classify_collecting(&mut self, kind: BlockKind, position: usize) -> ModeEvent {
        let lines = self.lines;
        let patterns = &self.extractor.patterns;
        let text = lines[position].text.trim();
        if text.is_empty() {
            return ModeEvent::Blank;
        }

        let markers = patterns.find_markers(text);
        if let Some(first) = markers.first() {
            let prefix = text[..first.byte_start].trim();
            if kind == BlockKind::Grid && (prefix.ends_with(':') || prefix.ends_with('?')) {
                return ModeEvent::Idle;
            }
            return ModeEvent::Row(position);
        }
        if heading::detect(patterns, text, lines.get(position + 1), true).is_some() {
            return ModeEvent::Heading;
        }
        if noise::is_noise_line(patterns, text) {
            self.diagnostics.noise_lines += 1;
            return ModeEvent::Noise;
        }
        if kind == BlockKind::Conditions && grid::is_condition_phrase_row(patterns, text) {
            return ModeEvent::Row(position);
        }
        ModeEvent::Idle
    }

    fn flush(&mut self, kind: BlockKind, block: CollectBlock) {
        let extractor = self.extractor;
        match kind {
            BlockKind::Grid => {
                match grid::parse_grid(self.lines, &block, &extractor.config, &extractor.patterns) {
                    GridOutcome::Parsed(fields) => {
                        self.diagnostics.grids_parsed += 1;
                        self.count_recognized(block.positions().len());
                        self.candidates.extend(fields);
                    }
                    GridOutcome::Ambiguous => {
                        self.diagnostics.grid_fallbacks += 1;
                        debug!(rows = block.rows.len(), "ambiguous grid, reading rows inline");
                        if let Some(intro) = block.intro_candidate.clone() {
                            self.candidates.push(intro);
                        }
                        let mut resume = 0;
                        for position in block.positions() {
                            if position < resume {
                                continue;
                            }
                            let (consumed, _) = self.scan_line(position, false);
                            resume = position + consumed.max(1);
                        }
                    }
                }
            }
            BlockKind::Conditions => {
                self.diagnostics.condition_blocks += 1;
                if block.rows.is_empty() {
                    if let Some(intro) = block.intro_candidate {
                        self.candidates.push(intro);
                    }
                    return;
                }
                let candidate = grid::parse_conditions(self.lines, &block, &extractor.patterns);
                self.count_recognized(block.rows.len());
                self.candidates.push(candidate);
            }
        }
    }

    /// Retracts the last candidate when it is a prompt; its title is about
    /// to be reused.
    fn take_prompt(&mut self) -> Option<FieldCandidate> {
        if !self.candidates.last().is_some_and(|c| c.prompt) {
            return None;
        }
        self.diagnostics.prompts_absorbed += 1;
        self.candidates.pop()
    }

    fn count_recognized(&mut self, lines: usize) {
        self.diagnostics.relevant_lines += lines;
        self.diagnostics.recognized_lines += lines;
    }

    fn drop_line(&mut self, line: &IndexedLine) {
        self.diagnostics.relevant_lines += 1;
        self.diagnostics
            .unresolved_lines
            .push(line.text.trim().to_string());
    }
}
