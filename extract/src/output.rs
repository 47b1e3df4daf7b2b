//! Output formatting for extracted documents and reports.

use form_schema_core::{Field, FormDocument};

use crate::report::{BatchReport, ExtractionReport};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum OutputFormat {
    Json,
    Yaml,
    Markdown,
    Table,
}

impl OutputFormat {
    /// File extension used when writing this format to disk.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Yaml => "yaml",
            Self::Markdown => "md",
            Self::Table => "txt",
        }
    }
}

/// Formats a document in the requested output format.
pub fn format_document(document: &FormDocument, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(document)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(document).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(document_to_markdown(document)),
        OutputFormat::Table => Ok(document_to_table(document)),
    }
}

/// Formats an extraction report in the requested output format.
pub fn format_report(report: &ExtractionReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(report).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown => Ok(report_to_markdown(report)),
        OutputFormat::Table => Ok(report_to_table(report)),
    }
}

/// Formats a batch report. Markdown and table render one line per document.
pub fn format_batch_report(report: &BatchReport, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Json => serde_json::to_string_pretty(report)
            .map_err(|e| format!("JSON serialization failed: {e}")),
        OutputFormat::Yaml => {
            serde_yaml::to_string(report).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        OutputFormat::Markdown | OutputFormat::Table => {
            let mut out = String::new();
            for entry in &report.reports {
                out.push_str(&report_to_table(entry));
            }
            for failure in &report.failures {
                out.push_str(&format!("FAILED {failure}\n"));
            }
            Ok(out)
        }
    }
}

/// Markdown table cell text with pipes escaped.
fn cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn field_detail(field: &Field) -> String {
    if !field.control.options.is_empty() {
        let names = field.control.option_names().join(", ");
        return if field.control.multi == Some(true) {
            format!("{names} (multi)")
        } else {
            names
        };
    }
    if let Some(condition) = &field.conditional_on {
        return format!("if {} = {}", condition.key, condition.value);
    }
    if let Some(kind) = field.control.input_type {
        return format!("{kind:?}").to_lowercase();
    }
    String::new()
}

fn document_to_markdown(document: &FormDocument) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", document.source));
    out.push_str(&format!("**Fields:** {}\n\n", document.field_count()));
    if let Some(ref digest) = document.catalog_digest {
        out.push_str(&format!("**Catalog:** `{digest}`\n\n"));
    }

    if document.fields.is_empty() {
        return out;
    }

    out.push_str("| Key | Title | Section | Type | Details | Confidence |\n");
    out.push_str("|-----|-------|---------|------|---------|------------|\n");
    for field in &document.fields {
        out.push_str(&format!(
            "| `{}` | {} | {} | {} | {} | {:.2} |\n",
            field.key,
            cell(&field.title),
            field.section,
            field.field_type,
            cell(&field_detail(field)),
            field.confidence,
        ));
    }

    out
}

fn document_to_table(document: &FormDocument) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Source: {}  Fields: {}\n",
        document.source,
        document.field_count()
    ));

    let max_key = document
        .fields
        .iter()
        .map(|f| f.key.len())
        .max()
        .unwrap_or(3);
    for field in &document.fields {
        out.push_str(&format!(
            "  {:<width$}  {:<9}  {}\n",
            field.key,
            field.field_type.as_str(),
            field.title,
            width = max_key
        ));
    }
    out
}

fn report_to_markdown(report: &ExtractionReport) -> String {
    let mut out = String::new();

    out.push_str(&format!("# Extraction Report: {}\n\n", report.source));
    out.push_str(&format!(
        "- **Success:** {}\n",
        if report.success { "yes" } else { "no" }
    ));
    out.push_str(&format!("- **Quality Tier:** {}\n", report.quality_tier));
    out.push_str(&format!("- **Fields:** {}\n", report.field_count));
    out.push_str(&format!("- **Mean Confidence:** {:.2}\n", report.mean_confidence));
    out.push_str(&format!("- **Coverage:** {:.2}\n", report.coverage));
    out.push_str(&format!(
        "- **Templates:** {} exact, {} fuzzy, {} novel\n",
        report.exact_matches, report.fuzzy_matches, report.novel_fields
    ));
    if report.grids_parsed > 0 || report.grid_fallbacks > 0 {
        out.push_str(&format!(
            "- **Grids:** {} parsed, {} read row by row\n",
            report.grids_parsed, report.grid_fallbacks
        ));
    }

    if !report.rule_hits.is_empty() {
        out.push_str("\n## Rules\n\n");
        out.push_str("| Rule | Lines |\n");
        out.push_str("|------|-------|\n");
        for (rule, hits) in &report.rule_hits {
            out.push_str(&format!("| `{rule}` | {hits} |\n"));
        }
    }

    if !report.quality_reasons.is_empty() {
        out.push_str("\n## Quality\n\n");
        for reason in &report.quality_reasons {
            out.push_str(&format!("- {reason}\n"));
        }
    }

    if !report.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for w in &report.warnings {
            out.push_str(&format!("- {w}\n"));
        }
    }

    if !report.validation_errors.is_empty() {
        out.push_str("\n## Validation Errors\n\n");
        for e in &report.validation_errors {
            out.push_str(&format!("- {e}\n"));
        }
    }

    if !report.unresolved_lines.is_empty() {
        out.push_str("\n## Unresolved Lines\n\n");
        for line in &report.unresolved_lines {
            out.push_str(&format!("- `{line}`\n"));
        }
    }

    out
}

fn report_to_table(report: &ExtractionReport) -> String {
    let status = if report.success { "OK" } else { "FAIL" };
    format!(
        "{:<30} {:<6} {:<8} fields={:<4} conf={:.2} cov={:.2}\n",
        report.source,
        status,
        report.quality_tier.to_string(),
        report.field_count,
        report.mean_confidence,
        report.coverage,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{QualityTier, sample_report};
    use form_schema_core::{Control, FieldType, InputKind, Section};

    fn sample_document() -> FormDocument {
        let mut document = FormDocument::new("intake.txt", "2024-01-15T10:30:00Z");
        document.fields.push(
            Field::new("gender", "Gender", FieldType::Radio)
                .with_section(Section::PatientInformation)
                .with_control(Control::choice(&["Male", "Female"], false)),
        );
        document.fields.push(
            Field::new("home_phone", "Home Phone", FieldType::Input)
                .with_control(Control::input(InputKind::Phone)),
        );
        document
    }

    #[test]
    fn test_format_document_json() {
        let json = format_document(&sample_document(), OutputFormat::Json).unwrap();
        assert!(json.contains("\"key\": \"gender\""));
        assert!(json.contains("\"type\": \"radio\""));
    }

    #[test]
    fn test_format_document_yaml() {
        let yaml = format_document(&sample_document(), OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("key: gender"));
    }

    #[test]
    fn test_format_document_markdown() {
        let md = format_document(&sample_document(), OutputFormat::Markdown).unwrap();
        assert!(md.contains("# intake.txt"));
        assert!(md.contains("| `gender` | Gender | Patient Information | radio | Male, Female |"));
        assert!(md.contains("| phone |"));
    }

    #[test]
    fn test_format_document_table() {
        let table = format_document(&sample_document(), OutputFormat::Table).unwrap();
        assert!(table.contains("Fields: 2"));
        assert!(table.contains("home_phone"));
    }

    #[test]
    fn test_format_report_markdown() {
        let md = format_report(&sample_report(), OutputFormat::Markdown).unwrap();
        assert!(md.contains("# Extraction Report: intake.txt"));
        assert!(md.contains("**Quality Tier:** high"));
        assert!(md.contains("| `fill_in` | 4 |"));
        assert!(md.contains("`see reverse side`"));
    }

    #[test]
    fn test_format_report_table_failure() {
        let mut report = sample_report();
        report.success = false;
        report.quality_tier = QualityTier::Failed;
        let table = format_report(&report, OutputFormat::Table).unwrap();
        assert!(table.contains("FAIL"));
        assert!(table.contains("failed"));
    }

    #[test]
    fn test_markdown_cells_escape_pipes() {
        let mut document = sample_document();
        document.fields[0].title = "Sex | Gender".to_string();
        let md = format_document(&document, OutputFormat::Markdown).unwrap();
        assert!(md.contains("Sex \\| Gender"));
    }
}
