//! Structured extraction reporting.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use form_schema_catalog::MatchEvent;
use form_schema_core::FormDocument;

use crate::parser::consolidate::ConsolidationStats;

/// Quality tier assigned to one extraction report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    High,
    Medium,
    Low,
    Failed,
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Per-document extraction report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionReport {
    /// Source document name.
    pub source: String,
    pub success: bool,
    pub quality_tier: QualityTier,
    pub quality_reasons: Vec<String>,
    pub total_lines: usize,
    pub relevant_lines: usize,
    pub recognized_lines: usize,
    pub noise_lines: usize,
    pub coverage: f64,
    /// Relevant lines no rule could use.
    pub unresolved_lines: Vec<String>,
    pub field_count: usize,
    /// Firing counts keyed by rule name.
    pub rule_hits: BTreeMap<String, usize>,
    pub grids_parsed: usize,
    pub grid_fallbacks: usize,
    pub condition_blocks: usize,
    pub prompts_absorbed: usize,
    pub exact_matches: usize,
    pub fuzzy_matches: usize,
    pub novel_fields: usize,
    pub renamed_keys: usize,
    pub match_events: Vec<MatchEvent>,
    pub consolidation: ConsolidationStats,
    pub mean_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_digest: Option<String>,
    pub warnings: Vec<String>,
    pub validation_errors: Vec<String>,
}

/// A document together with the report describing how it was produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionRun {
    pub document: FormDocument,
    pub report: ExtractionReport,
}

/// Aggregate report for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub schema_version: String,
    pub generated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_digest: Option<String>,
    pub reports: Vec<ExtractionReport>,
    /// Inputs that could not be read, as `"<path>: <error>"`.
    pub failures: Vec<String>,
}

impl BatchReport {
    /// Number of reports per quality tier, in tier order.
    pub fn tier_summary(&self) -> Vec<(QualityTier, usize)> {
        [
            QualityTier::High,
            QualityTier::Medium,
            QualityTier::Low,
            QualityTier::Failed,
        ]
        .into_iter()
        .map(|tier| {
            let count = self.reports.iter().filter(|r| r.quality_tier == tier).count();
            (tier, count)
        })
        .filter(|(_, count)| *count > 0)
        .collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_report() -> ExtractionReport {
    ExtractionReport {
        source: "intake.txt".to_string(),
        success: true,
        quality_tier: QualityTier::High,
        quality_reasons: Vec::new(),
        total_lines: 12,
        relevant_lines: 10,
        recognized_lines: 9,
        noise_lines: 2,
        coverage: 0.9,
        unresolved_lines: vec!["see reverse side".to_string()],
        field_count: 7,
        rule_hits: BTreeMap::from([("fill_in".to_string(), 4), ("checkbox_row".to_string(), 3)]),
        grids_parsed: 0,
        grid_fallbacks: 0,
        condition_blocks: 0,
        prompts_absorbed: 0,
        exact_matches: 5,
        fuzzy_matches: 1,
        novel_fields: 1,
        renamed_keys: 2,
        match_events: Vec::new(),
        consolidation: ConsolidationStats::default(),
        mean_confidence: 0.88,
        catalog_digest: None,
        warnings: Vec::new(),
        validation_errors: Vec::new(),
    }
}
