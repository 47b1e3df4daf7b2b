//! Field extraction and normalization for linearized form text.
//!
//! This crate turns the lines of an OCR'd or text-exported intake form into
//! an ordered list of typed [`Field`]s: it detects labels, blanks,
//! checkbox rows and multi-column grids, normalizes what it finds against a
//! [`TemplateCatalog`] of canonical fields, and consolidates the result
//! into a list with unique keys and valid conditional links.
//!
//! # Main entry points
//!
//! - [`extract_fields`]: one-shot extraction from raw lines.
//! - [`FormExtractor`]: the reusable, thread-safe extractor behind it.
//! - [`extract_document`]: extraction of a whole text document into a
//!   [`FormDocument`] plus an [`ExtractionReport`] with coverage, rule and
//!   template statistics.
//! - [`batch::extract_batch`]: many documents in parallel.
//!
//! # Example
//!
//! ```
//! use form_schema_catalog::TemplateCatalog;
//! use form_schema_extract::{ExtractConfig, extract_fields};
//!
//! let lines = [
//!     "Are you under a physician's care now? [ ] Yes [ ] No  If yes, please explain: ________",
//! ];
//! let catalog = TemplateCatalog::builtin().unwrap();
//! let fields = extract_fields(&lines, &catalog, &ExtractConfig::default()).unwrap();
//!
//! assert_eq!(fields.len(), 2);
//! assert_eq!(fields[0].control.option_names(), vec!["Yes", "No"]);
//! let condition = fields[1].conditional_on.as_ref().unwrap();
//! assert_eq!(condition.key, fields[0].key);
//! assert_eq!(condition.value, "yes");
//! ```
//!
//! [`Field`]: form_schema_core::Field
//! [`FormDocument`]: form_schema_core::FormDocument
//! [`TemplateCatalog`]: form_schema_catalog::TemplateCatalog

pub mod batch;
pub mod config;
pub mod error;
pub mod output;
pub mod parser;
pub mod report;

use chrono::Utc;

use form_schema_catalog::TemplateCatalog;
use form_schema_core::{Field, FormDocument, validate_fields};

pub use config::{EmissionMode, ExtractConfig, PatternConfig};
pub use error::{ExtractError, Result};
pub use parser::normalize::{normalize_lines, normalize_text};
pub use parser::{Detection, FormExtractor, IndexedLine, PipelineOutput};
pub use report::{BatchReport, ExtractionReport, ExtractionRun, QualityTier};

use parser::confidence::{mean_confidence, quality_tier};

/// Extracts the ordered field list from one document's lines.
///
/// # Errors
///
/// Fails only when `config` is invalid; the extraction itself never fails.
/// Empty input yields an empty list.
pub fn extract_fields<S: AsRef<str>>(
    lines: &[S],
    catalog: &TemplateCatalog,
    config: &ExtractConfig,
) -> Result<Vec<Field>> {
    let extractor = FormExtractor::new(config.clone())?;
    Ok(extractor.extract(lines, catalog))
}

/// Extracts a whole text document and reports how it went.
///
/// `source` names the document in the envelope and report. The report's
/// quality tier combines field count, line coverage and mean confidence.
pub fn extract_document(
    extractor: &FormExtractor,
    source: &str,
    text: &str,
    catalog: &TemplateCatalog,
) -> ExtractionRun {
    let lines = normalize_text(text);
    let output = extractor.run(&lines, catalog);
    let diagnostics = &output.diagnostics;

    let coverage = diagnostics.coverage();
    let mean = mean_confidence(&output.fields);
    let (tier, quality_reasons) = quality_tier(output.fields.len(), coverage, mean);
    let validation_errors: Vec<String> = validate_fields(&output.fields)
        .iter()
        .map(ToString::to_string)
        .collect();

    let report = ExtractionReport {
        source: source.to_string(),
        success: !output.fields.is_empty() && validation_errors.is_empty(),
        quality_tier: tier,
        quality_reasons,
        total_lines: lines.len(),
        relevant_lines: diagnostics.relevant_lines,
        recognized_lines: diagnostics.recognized_lines,
        noise_lines: diagnostics.noise_lines,
        coverage,
        unresolved_lines: diagnostics.unresolved_lines.clone(),
        field_count: output.fields.len(),
        rule_hits: diagnostics.rule_hits.clone(),
        grids_parsed: diagnostics.grids_parsed,
        grid_fallbacks: diagnostics.grid_fallbacks,
        condition_blocks: diagnostics.condition_blocks,
        prompts_absorbed: diagnostics.prompts_absorbed,
        exact_matches: output.templating.exact,
        fuzzy_matches: output.templating.fuzzy,
        novel_fields: output.templating.novel,
        renamed_keys: output.templating.renamed,
        match_events: output.templating.events.clone(),
        consolidation: output.consolidation.clone(),
        mean_confidence: mean,
        catalog_digest: Some(catalog.digest().to_string()),
        warnings: diagnostics.warnings(),
        validation_errors,
    };

    let mut document =
        FormDocument::new(source, Utc::now().to_rfc3339()).with_catalog_digest(catalog.digest());
    document.fields = output.fields;

    ExtractionRun { document, report }
}
