//! Ordered line rules for the scanning mode.
//!
//! Each rule is an independent predicate+action object: it inspects one
//! line in context and either declines (`None`) or returns an outcome. The
//! detector tries rules in the order given by [`default_rules`]; the first
//! outcome wins and the line gets exactly one interpretation.

mod checkbox_row;
mod condition_intro;
mod fallback;
mod fill_in;
mod grid_trigger;
pub(crate) mod heading;
mod inline_options;
mod known_labels;
mod list_item;
pub(crate) mod noise;
mod slash;

use form_schema_core::{Field, Section};

use super::IndexedLine;
use super::ast::{FieldCandidate, SourceSpan};
use super::grid::GridStart;
use super::patterns::PatternSet;
use crate::config::ExtractConfig;

/// Everything a rule may look at besides the line itself.
pub(crate) struct RuleContext<'a> {
    pub config: &'a ExtractConfig,
    pub patterns: &'a PatternSet,
    pub section: Section,
    pub lines: &'a [IndexedLine],
    pub position: usize,
    /// Most recently emitted candidate.
    pub previous: Option<&'a FieldCandidate>,
    /// Title of a fallback prompt emitted for the immediately preceding line.
    pub prompt: Option<&'a str>,
    /// Whether grid detection is enabled for this pass.
    pub grid_probe: bool,
}

impl<'a> RuleContext<'a> {
    pub(crate) fn next_line(&self) -> Option<&'a IndexedLine> {
        self.lines.get(self.position + 1)
    }

    pub(crate) fn span(&self, line: &IndexedLine, consumed: usize) -> SourceSpan {
        let last = self
            .lines
            .get(self.position + consumed.saturating_sub(1))
            .map_or(line.index, |l| l.index);
        SourceSpan::new(line.index, last)
    }

    /// Wraps a field in a candidate placed in the current section.
    pub(crate) fn candidate(
        &self,
        field: Field,
        line: &IndexedLine,
        consumed: usize,
        rule: &'static str,
    ) -> FieldCandidate {
        FieldCandidate::new(field.with_section(self.section), self.span(line, consumed), rule)
    }

    /// Returns `true` when the previous candidate is a terms block ending
    /// within two lines of `line`.
    pub(crate) fn follows_terms(&self, line: &IndexedLine) -> bool {
        self.previous.is_some_and(|candidate| {
            candidate.is_terms() && line.index <= candidate.source_span.line_end + 2
        })
    }
}

/// Why a line produced nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DiscardReason {
    /// Boilerplate, separators and bare fill lines.
    Noise,
    /// Relevant text no rule could use.
    Dropped,
}

/// What a rule decided for a line.
#[derive(Debug, Clone)]
pub(crate) enum RuleOutcome {
    /// A section heading; `None` keeps the current section.
    Section {
        section: Option<Section>,
        consumed: usize,
    },
    Discard(DiscardReason),
    /// Text appended to the most recent terms block.
    AppendTerms { text: String, new_paragraph: bool },
    Fields {
        fields: Vec<FieldCandidate>,
        consumed: usize,
        /// Retract the preceding prompt candidate; its text was used as a title.
        absorb_prompt: bool,
    },
    StartGrid(GridStart),
    /// A "do you have any of the following" intro opening a condition list.
    StartConditions { intro: String },
}

impl RuleOutcome {
    pub(crate) fn fields(fields: Vec<FieldCandidate>, consumed: usize, absorb_prompt: bool) -> Self {
        Self::Fields {
            fields,
            consumed,
            absorb_prompt,
        }
    }
}

/// A line rule.
pub(crate) trait LineRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, ctx: &RuleContext<'_>, line: &IndexedLine) -> Option<RuleOutcome>;
}

/// Rules in priority order.
pub(crate) fn default_rules() -> Vec<Box<dyn LineRule>> {
    vec![
        Box::new(heading::HeadingRule),
        Box::new(noise::NoiseRule),
        Box::new(list_item::ListItemRule),
        Box::new(condition_intro::ConditionIntroRule),
        Box::new(slash::SlashRule),
        Box::new(known_labels::KnownLabelRule),
        Box::new(inline_options::InlineOptionRule),
        Box::new(checkbox_row::CheckboxRowRule),
        Box::new(fill_in::FillInRule),
        Box::new(grid_trigger::GridTriggerRule),
        Box::new(fallback::FallbackRule),
    ]
}
