//! Diagnostics collected during one detection pass.

use std::collections::BTreeMap;

/// Line accounting and rule statistics for one document.
#[derive(Debug, Clone, Default)]
pub struct ParseDiagnostics {
    /// Non-blank lines that are not noise or separators.
    pub relevant_lines: usize,
    /// Relevant lines consumed by a rule that produced structure.
    pub recognized_lines: usize,
    /// Relevant lines dropped without producing anything.
    pub unresolved_lines: Vec<String>,
    pub noise_lines: usize,
    /// Number of times each rule fired.
    pub rule_hits: BTreeMap<String, usize>,
    pub grids_parsed: usize,
    /// Grid blocks that fell back to inline row extraction.
    pub grid_fallbacks: usize,
    pub condition_blocks: usize,
    pub prompts_absorbed: usize,
}

impl ParseDiagnostics {
    pub fn coverage(&self) -> f64 {
        if self.relevant_lines == 0 {
            return 0.0;
        }
        self.recognized_lines as f64 / self.relevant_lines as f64
    }

    pub(crate) fn record_hit(&mut self, rule: &str) {
        *self.rule_hits.entry(rule.to_string()).or_insert(0) += 1;
    }

    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.unresolved_lines.is_empty() {
            warnings.push(format!(
                "Dropped {} unclassifiable lines",
                self.unresolved_lines.len()
            ));
        }

        if self.grid_fallbacks > 0 {
            warnings.push(format!(
                "{} checkbox blocks were too ambiguous for grid parsing and were read row by row",
                self.grid_fallbacks
            ));
        }

        if self.relevant_lines > 0 && self.coverage() < 0.5 {
            warnings.push(format!(
                "Low line coverage: {:.0}% of relevant lines recognized",
                self.coverage() * 100.0
            ));
        }

        warnings
    }
}
