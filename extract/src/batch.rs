//! Parallel extraction over many documents.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, warn};

use form_schema_catalog::TemplateCatalog;
use form_schema_core::SCHEMA_CONTRACT_VERSION;

use crate::error::{ExtractError, Result};
use crate::parser::FormExtractor;
use crate::report::{BatchReport, ExtractionRun};
use crate::extract_document;

const TEXT_EXTENSIONS: [&str; 2] = ["txt", "text"];

/// Runs and failures from one batch, sorted by input path.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub runs: Vec<ExtractionRun>,
    /// Inputs that could not be read, as `"<path>: <error>"`.
    pub failures: Vec<String>,
}

fn is_text_file(path: &Path) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|ext| TEXT_EXTENSIONS.iter().any(|t| ext.eq_ignore_ascii_case(t)))
}

/// Collects text document paths from input files and/or directories.
///
/// Directories contribute their `.txt`/`.text` files (not recursively).
/// The result is sorted and free of duplicates.
///
/// # Errors
///
/// Returns [`ExtractError::InvalidInput`] when no inputs are given, a path
/// does not exist, a file has the wrong extension, or nothing is found.
pub fn collect_input_paths(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    if inputs.is_empty() {
        return Err(ExtractError::InvalidInput(
            "No input paths were provided".to_string(),
        ));
    }

    let mut paths = BTreeSet::new();

    for input in inputs {
        if input.is_dir() {
            for entry in fs::read_dir(input)? {
                let path = entry?.path();
                if path.is_file() && is_text_file(&path) {
                    paths.insert(path);
                }
            }
            continue;
        }

        if input.is_file() {
            if !is_text_file(input) {
                return Err(ExtractError::InvalidInput(format!(
                    "Input file '{}' must end in .txt",
                    input.display()
                )));
            }
            paths.insert(input.clone());
            continue;
        }

        return Err(ExtractError::InvalidInput(format!(
            "Input path '{}' does not exist",
            input.display()
        )));
    }

    if paths.is_empty() {
        return Err(ExtractError::InvalidInput(
            "No text documents found in provided paths".to_string(),
        ));
    }

    Ok(paths.into_iter().collect())
}

/// Reads one document, replacing invalid UTF-8 sequences.
pub fn read_document(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Document name used in envelopes and reports: the file name.
pub fn source_name(path: &Path) -> String {
    path.file_name()
        .and_then(OsStr::to_str)
        .map_or_else(|| path.display().to_string(), str::to_string)
}

/// Extracts every document in `paths` on a worker pool.
///
/// The extractor and catalog are shared read-only by all workers. Results
/// come back in path order regardless of scheduling. `jobs` of `None` or 0
/// picks a default from the CPU count and workload.
///
/// # Errors
///
/// Fails only if the worker pool cannot be built; unreadable documents are
/// listed in [`BatchOutcome::failures`].
pub fn extract_batch(
    extractor: &FormExtractor,
    catalog: &TemplateCatalog,
    paths: &[PathBuf],
    jobs: Option<usize>,
) -> Result<BatchOutcome> {
    let jobs = jobs
        .filter(|jobs| *jobs > 0)
        .unwrap_or_else(|| default_parallel_jobs(paths.len()));
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    debug!(documents = paths.len(), jobs, "starting batch extraction");

    let extract_one = |path: &PathBuf| -> (PathBuf, Result<ExtractionRun>) {
        let run = read_document(path)
            .map(|text| extract_document(extractor, &source_name(path), &text, catalog));
        (path.clone(), run)
    };

    let mut results: Vec<(PathBuf, Result<ExtractionRun>)> =
        pool.install(|| paths.par_iter().map(extract_one).collect());

    // Sort by path for deterministic output.
    results.sort_by(|(a, _), (b, _)| a.cmp(b));

    let mut outcome = BatchOutcome::default();
    for (path, run) in results {
        match run {
            Ok(run) => outcome.runs.push(run),
            Err(err) => {
                warn!(path = %path.display(), error = %err, "skipping unreadable document");
                outcome.failures.push(format!("{}: {err}", path.display()));
            }
        }
    }
    Ok(outcome)
}

pub fn default_parallel_jobs(document_count: usize) -> usize {
    let cpu_count = std::thread::available_parallelism()
        .map(|parallelism| parallelism.get())
        .unwrap_or(4);
    cpu_count.min(16).max(1).min(document_count.max(1))
}

/// Builds the serializable aggregate report for a batch.
pub fn build_batch_report(outcome: &BatchOutcome, catalog: &TemplateCatalog) -> BatchReport {
    BatchReport {
        schema_version: SCHEMA_CONTRACT_VERSION.to_string(),
        generated_at: Utc::now().to_rfc3339(),
        catalog_digest: Some(catalog.digest().to_string()),
        reports: outcome.runs.iter().map(|run| run.report.clone()).collect(),
        failures: outcome.failures.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractConfig;

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_collect_input_paths_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "b.txt", "Name ____");
        write(dir.path(), "a.TXT", "Name ____");
        write(dir.path(), "notes.md", "ignored");

        let paths = collect_input_paths(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<String> = paths.iter().map(|p| source_name(p)).collect();
        assert_eq!(names, vec!["a.TXT", "b.txt"]);
    }

    #[test]
    fn test_collect_input_paths_errors() {
        assert!(collect_input_paths(&[]).is_err());

        let dir = tempfile::tempdir().unwrap();
        assert!(collect_input_paths(&[dir.path().join("missing.txt")]).is_err());
        let markdown = write(dir.path(), "form.md", "x");
        assert!(collect_input_paths(&[markdown]).is_err());
        assert!(collect_input_paths(&[dir.path().to_path_buf()]).is_err());
    }

    #[test]
    fn test_read_document_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("form.txt");
        fs::write(&path, b"Name \xff____").unwrap();
        assert!(read_document(&path).unwrap().starts_with("Name "));
    }

    #[test]
    fn test_extract_batch_is_ordered_and_reports_failures() {
        let dir = tempfile::tempdir().unwrap();
        let second = write(dir.path(), "b.txt", "Home Phone: _____________\n");
        let first = write(dir.path(), "a.txt", "Sex: [ ] Male [ ] Female\n");
        let missing = dir.path().join("c.txt");

        let extractor = FormExtractor::new(ExtractConfig::default()).unwrap();
        let catalog = TemplateCatalog::builtin().unwrap();
        let outcome = extract_batch(&extractor, &catalog, &[second, missing, first], Some(2)).unwrap();

        let sources: Vec<&str> = outcome.runs.iter().map(|r| r.document.source.as_str()).collect();
        assert_eq!(sources, vec!["a.txt", "b.txt"]);
        assert_eq!(outcome.failures.len(), 1);
        assert!(outcome.failures[0].contains("c.txt"));

        let report = build_batch_report(&outcome, &catalog);
        assert_eq!(report.reports.len(), 2);
        assert_eq!(report.schema_version, SCHEMA_CONTRACT_VERSION);
        assert!(report.generated_at.contains('T'));
    }

    #[test]
    fn test_default_parallel_jobs_is_bounded_by_workload() {
        assert_eq!(default_parallel_jobs(0), 1);
        assert_eq!(default_parallel_jobs(1), 1);
        assert!(default_parallel_jobs(1000) <= 16);
    }
}
