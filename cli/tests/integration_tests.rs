use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const INTAKE: &str = "\
PATIENT INFORMATION
First Name ____________    MI ___    Last Name ______________
Sex: [ ] Male [ ] Female
Home Phone: _______________

MEDICAL HISTORY
Are you under a physician's care now? [ ] Yes [ ] No  If yes, please explain: ________
";

fn form_extract(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_form-extract"))
        .args(args)
        .output()
        .expect("failed to run form-extract")
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).expect("failed to write fixture");
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

#[test]
fn extract_prints_json_document() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "intake.txt", INTAKE);

    let output = form_extract(&["extract", "--input", input.to_str().unwrap()]);
    assert!(output.status.success(), "extract should succeed");

    let document: serde_json::Value = serde_json::from_str(&stdout(&output)).unwrap();
    assert_eq!(document["source"], "intake.txt");
    let keys: Vec<&str> = document["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["key"].as_str().unwrap())
        .collect();
    assert!(keys.contains(&"first_name"));
    assert!(keys.contains(&"gender"));
    assert!(keys.contains(&"home_phone"));
}

#[test]
fn extract_with_report_writes_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "intake.txt", INTAKE);
    let out = dir.path().join("nested").join("intake.json");

    let output = form_extract(&[
        "extract",
        "--input",
        input.to_str().unwrap(),
        "--with-report",
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(output.status.success());

    let raw = fs::read_to_string(&out).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert!(value["document"]["fields"].is_array());
    assert_eq!(value["report"]["source"], "intake.txt");
    assert!(value["report"]["coverage"].as_f64().unwrap() > 0.0);
}

#[test]
fn extract_markdown_format() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "intake.txt", INTAKE);

    let output = form_extract(&[
        "extract",
        "--input",
        input.to_str().unwrap(),
        "--format",
        "markdown",
    ]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("# intake.txt"));
    assert!(text.contains("| `gender` |"));
}

#[test]
fn extract_rejects_missing_input() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.txt");
    let output = form_extract(&["extract", "--input", missing.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn extract_rejects_invalid_config() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "intake.txt", INTAKE);
    let config = write(dir.path(), "config.yaml", "template_match_threshold: 2.0\n");

    let output = form_extract(&[
        "extract",
        "--input",
        input.to_str().unwrap(),
        "--config",
        config.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
}

// ---------------------------------------------------------------------------
// batch
// ---------------------------------------------------------------------------

#[test]
fn batch_writes_documents_and_report() {
    let dir = tempfile::tempdir().unwrap();
    let inputs = dir.path().join("forms");
    fs::create_dir_all(&inputs).unwrap();
    write(&inputs, "intake.txt", INTAKE);
    write(&inputs, "short.txt", "Email: ____________________\n");
    write(&inputs, "notes.md", "ignored");
    let out = dir.path().join("out");

    let output = form_extract(&[
        "batch",
        "--inputs",
        inputs.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
        "--jobs",
        "2",
    ]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("wrote 2 document file(s)"));

    assert!(out.join("intake.json").exists());
    assert!(out.join("short.json").exists());
    let report: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out.join("extraction-report.json")).unwrap())
            .unwrap();
    let sources: Vec<&str> = report["reports"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["source"].as_str().unwrap())
        .collect();
    assert_eq!(sources, vec!["intake.txt", "short.txt"]);
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

#[test]
fn validate_accepts_extracted_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "intake.txt", INTAKE);
    let out = dir.path().join("intake.json");

    let extract = form_extract(&[
        "extract",
        "--input",
        input.to_str().unwrap(),
        "--output",
        out.to_str().unwrap(),
    ]);
    assert!(extract.status.success());

    let output = form_extract(&["validate", out.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(stdout(&output).contains("Validated 1 document file(s)"));
}

#[test]
fn validate_reports_duplicate_keys() {
    let dir = tempfile::tempdir().unwrap();
    let json = serde_json::json!({
        "schema_version": "1.0.0",
        "source": "bad.txt",
        "generated_at": "2024-01-15T10:30:00Z",
        "fields": [
            {"key": "email", "title": "Email", "section": "General", "type": "input", "control": {}},
            {"key": "email", "title": "E-mail", "section": "General", "type": "input", "control": {}}
        ]
    });
    let path = write(dir.path(), "bad.json", &json.to_string());

    let output = form_extract(&["validate", path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("duplicate key: email"));
}

// ---------------------------------------------------------------------------
// catalog
// ---------------------------------------------------------------------------

#[test]
fn catalog_prints_count_and_digest() {
    let output = form_extract(&["catalog"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Templates: "));
    assert!(text.contains("Digest: "));
}

#[test]
fn catalog_loads_custom_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "catalog.yaml",
        "version: \"2024.1\"\ntemplates:\n  - canonical_key: first_name\n    aliases: [first name, given name]\n    default_type: input\n",
    );

    let output = form_extract(&["catalog", "--catalog", path.to_str().unwrap(), "--list"]);
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("Templates: 1"));
    assert!(text.contains("Version: 2024.1"));
    assert!(text.contains("first_name"));
}
