mod logging;

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use form_schema_catalog::TemplateCatalog;
use form_schema_core::{FormDocument, validate_document};
use form_schema_extract::batch::{
    build_batch_report, collect_input_paths, extract_batch, read_document, source_name,
};
use form_schema_extract::output::{
    OutputFormat, format_batch_report, format_document, format_report,
};
use form_schema_extract::{ExtractConfig, ExtractionReport, FormExtractor, extract_document};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "form-extract")]
#[command(about = "Structured field extraction from linearized intake forms")]
struct Cli {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract fields from one text document.
    Extract(ExtractArgs),
    /// Extract fields from many documents in parallel.
    Batch(BatchArgs),
    /// Validate previously written document files.
    Validate(ValidateArgs),
    /// Show the template catalog in use.
    Catalog(CatalogArgs),
}

#[derive(Debug, Args)]
struct SourceArgs {
    /// Template catalog file (JSON or YAML). Defaults to the builtin catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Extraction config file (YAML or JSON).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ExtractArgs {
    /// Input text file. Reads stdin when omitted.
    #[arg(long)]
    input: Option<PathBuf>,
    #[command(flatten)]
    source: SourceArgs,
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
    /// Include the extraction report.
    #[arg(long)]
    with_report: bool,
    /// Write to this file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct BatchArgs {
    /// Input files and/or directories of .txt documents.
    #[arg(long, num_args = 1.., required = true)]
    inputs: Vec<PathBuf>,
    /// Output directory for per-document files and the batch report.
    #[arg(long)]
    output: PathBuf,
    /// Parallel extraction workers (default: based on CPU count).
    #[arg(long)]
    jobs: Option<usize>,
    #[command(flatten)]
    source: SourceArgs,
    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Document files (JSON or YAML) written by `extract` or `batch`.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,
}

#[derive(Debug, Args)]
struct CatalogArgs {
    /// Template catalog file (JSON or YAML). Defaults to the builtin catalog.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// List every canonical key.
    #[arg(long)]
    list: bool,
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let result = match cli.command {
        Command::Extract(args) => run_extract(args),
        Command::Batch(args) => run_batch(args),
        Command::Validate(args) => run_validate(args),
        Command::Catalog(args) => run_catalog(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_catalog(path: Option<&Path>) -> Result<TemplateCatalog, String> {
    match path {
        Some(path) => TemplateCatalog::from_path(path)
            .map_err(|err| format!("Failed to load catalog '{}': {err}", path.display())),
        None => TemplateCatalog::builtin().map_err(|err| format!("Builtin catalog: {err}")),
    }
}

fn load_extractor(source: &SourceArgs) -> Result<(FormExtractor, TemplateCatalog), String> {
    let config = match &source.config {
        Some(path) => ExtractConfig::load(path)
            .map_err(|err| format!("Failed to load config '{}': {err}", path.display()))?,
        None => ExtractConfig::default(),
    };
    let extractor = FormExtractor::new(config).map_err(|err| err.to_string())?;
    let catalog = load_catalog(source.catalog.as_deref())?;
    Ok((extractor, catalog))
}

fn write_or_print(output: Option<&Path>, raw: &str) -> Result<(), String> {
    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent).map_err(|err| {
                    format!(
                        "Failed to create output directory '{}': {err}",
                        parent.display()
                    )
                })?;
            }
            fs::write(path, raw).map_err(|err| format!("Failed to write '{}': {err}", path.display()))
        }
        None => {
            println!("{raw}");
            Ok(())
        }
    }
}

fn run_extract(args: ExtractArgs) -> Result<(), String> {
    let (extractor, catalog) = load_extractor(&args.source)?;

    let (source, text) = match &args.input {
        Some(path) => {
            let text = read_document(path)
                .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
            (source_name(path), text)
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|err| format!("Failed to read stdin: {err}"))?;
            ("stdin".to_string(), text)
        }
    };

    let run = extract_document(&extractor, &source, &text, &catalog);
    info!(
        source = %run.report.source,
        fields = run.report.field_count,
        tier = %run.report.quality_tier,
        "extracted document"
    );

    let raw = if args.with_report {
        #[derive(serde::Serialize)]
        struct ExtractOutput<'a> {
            document: &'a FormDocument,
            report: &'a ExtractionReport,
        }

        let output = ExtractOutput {
            document: &run.document,
            report: &run.report,
        };
        match args.format {
            OutputFormat::Json => serde_json::to_string_pretty(&output)
                .map_err(|e| format!("Failed to serialize output: {e}"))?,
            OutputFormat::Yaml => serde_yaml::to_string(&output)
                .map_err(|e| format!("Failed to serialize output: {e}"))?,
            format => {
                let mut raw = format_document(&run.document, format)?;
                raw.push('\n');
                raw.push_str(&format_report(&run.report, format)?);
                raw
            }
        }
    } else {
        format_document(&run.document, args.format)?
    };

    write_or_print(args.output.as_deref(), &raw)?;

    if !run.report.validation_errors.is_empty() {
        eprintln!(
            "{} validation error(s): {}",
            run.report.validation_errors.len(),
            run.report.validation_errors.join("; ")
        );
    }
    Ok(())
}

/// File stem for one document's output, made unique within the batch.
fn output_stem(source: &str, used: &mut HashSet<String>) -> String {
    let base = Path::new(source)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .filter(|stem| !stem.is_empty())
        .unwrap_or("document")
        .to_string();

    let mut stem = base.clone();
    let mut suffix = 2;
    while !used.insert(stem.clone()) {
        stem = format!("{base}-{suffix}");
        suffix += 1;
    }
    stem
}

fn run_batch(args: BatchArgs) -> Result<(), String> {
    let (extractor, catalog) = load_extractor(&args.source)?;
    let paths = collect_input_paths(&args.inputs).map_err(|err| err.to_string())?;

    fs::create_dir_all(&args.output).map_err(|err| {
        format!(
            "Failed to create output directory '{}': {err}",
            args.output.display()
        )
    })?;

    let outcome =
        extract_batch(&extractor, &catalog, &paths, args.jobs).map_err(|err| err.to_string())?;

    let ext = args.format.extension();
    let mut used = HashSet::new();
    let mut written = 0usize;
    for run in &outcome.runs {
        let stem = output_stem(&run.document.source, &mut used);
        let path = args.output.join(format!("{stem}.{ext}"));
        let raw = format_document(&run.document, args.format)?;
        fs::write(&path, raw)
            .map_err(|err| format!("Failed to write '{}': {err}", path.display()))?;
        written += 1;
    }

    println!("Extracted and wrote {written} document file(s).");

    let report = build_batch_report(&outcome, &catalog);
    let report_path = args.output.join(format!("extraction-report.{ext}"));
    let report_raw = format_batch_report(&report, args.format)?;
    fs::write(&report_path, report_raw)
        .map_err(|err| format!("Failed to write '{}': {err}", report_path.display()))?;

    let summary: Vec<String> = report
        .tier_summary()
        .iter()
        .map(|(tier, count)| format!("{count} {tier}"))
        .collect();
    if !summary.is_empty() {
        println!("Quality: {}", summary.join(", "));
    }

    if !outcome.failures.is_empty() {
        eprintln!(
            "{} document(s) could not be read: {}",
            outcome.failures.len(),
            outcome.failures.join(", ")
        );
    }
    Ok(())
}

fn load_document(path: &Path) -> Result<FormDocument, String> {
    let raw = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read '{}': {err}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(&raw)
            .map_err(|err| format!("Failed to parse '{}': {err}", path.display()))
    } else {
        serde_json::from_str(&raw)
            .map_err(|err| format!("Failed to parse '{}': {err}", path.display()))
    }
}

fn run_validate(args: ValidateArgs) -> Result<(), String> {
    let mut problems = Vec::new();
    let mut field_count = 0usize;

    for path in &args.inputs {
        let document = load_document(path)?;
        field_count += document.field_count();
        for error in validate_document(&document) {
            problems.push(format!("{}: {error}", path.display()));
        }
    }

    if !problems.is_empty() {
        return Err(format!(
            "{} validation error(s):\n  {}",
            problems.len(),
            problems.join("\n  ")
        ));
    }

    println!(
        "Validated {} document file(s) with {field_count} field(s).",
        args.inputs.len()
    );
    Ok(())
}

fn run_catalog(args: CatalogArgs) -> Result<(), String> {
    let catalog = load_catalog(args.catalog.as_deref())?;

    println!("Templates: {}", catalog.len());
    if let Some(version) = catalog.version() {
        println!("Version: {version}");
    }
    println!("Digest: {}", catalog.digest());

    if args.list {
        for template in catalog.templates() {
            println!(
                "  {:<32} {:<9} {}",
                template.canonical_key,
                template.default_type.as_str(),
                template.aliases.join(", ")
            );
        }
    }
    Ok(())
}
