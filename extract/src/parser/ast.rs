//! Intermediate candidates carrying evidence metadata.

use form_schema_core::{Field, FieldType};

/// Source line range within the document, used for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSpan {
    pub line_start: usize,
    pub line_end: usize,
}

impl SourceSpan {
    pub const fn single(line: usize) -> Self {
        Self {
            line_start: line,
            line_end: line,
        }
    }

    pub const fn new(line_start: usize, line_end: usize) -> Self {
        Self {
            line_start,
            line_end,
        }
    }

    pub const fn unknown() -> Self {
        Self {
            line_start: usize::MAX,
            line_end: usize::MAX,
        }
    }

    pub const fn is_unknown(&self) -> bool {
        self.line_start == usize::MAX && self.line_end == usize::MAX
    }
}

/// Candidate field produced by a line rule or the grid parser, carrying
/// provenance (source span, originating rule) for the later passes.
#[derive(Debug, Clone)]
pub struct FieldCandidate {
    pub field: Field,
    pub source_span: SourceSpan,
    pub rule: &'static str,
    /// Set when the candidate came out of a grid or condition block.
    pub grid_derived: bool,
    /// Character width of the blank-fill run allotted to this field.
    pub blank_width: Option<usize>,
    /// Set on fallback candidates whose line reads as a question or prompt.
    pub prompt: bool,
}

impl FieldCandidate {
    pub fn new(field: Field, source_span: SourceSpan, rule: &'static str) -> Self {
        Self {
            field,
            source_span,
            rule,
            grid_derived: false,
            blank_width: None,
            prompt: false,
        }
    }

    pub fn with_blank_width(mut self, width: usize) -> Self {
        self.blank_width = Some(width);
        self
    }

    pub fn grid_derived(mut self) -> Self {
        self.grid_derived = true;
        self
    }

    pub fn is_terms(&self) -> bool {
        self.field.field_type == FieldType::Terms
    }

    pub fn into_field(self) -> Field {
        self.field
    }
}
