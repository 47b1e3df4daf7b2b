use std::io::Write;

use form_schema_catalog::{
    CatalogError, CatalogSource, MatchConfig, MatchKind, NegativeRule, TemplateCatalog,
    TemplateMatcher, apply_template,
};
use form_schema_core::{Control, Field, FieldType, Section};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const YAML_STORE: &str = r#"
version: "test-1"
templates:
  - canonical_key: first_name
    default_type: input
    aliases: [first name, given name]
    section: Patient Information
  - canonical_key: employer
    default_type: input
    aliases: [employer, name of employer]
  - canonical_key: tobacco_use
    default_type: radio
    aliases: [do you smoke, tobacco]
    default_control:
      options:
        - { name: "Yes", value: "yes" }
        - { name: "No", value: "no" }
      multi: false
"#;

fn write_store(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    path
}

// ---------------------------------------------------------------------------
// File loading
// ---------------------------------------------------------------------------

#[test]
fn test_load_yaml_store_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(&dir, "templates.yaml", YAML_STORE);

    let catalog = TemplateCatalog::from_path(&path).unwrap();
    assert_eq!(catalog.len(), 3);
    assert_eq!(catalog.version(), Some("test-1"));
    assert_eq!(catalog.source(), &CatalogSource::File(path));
    assert_eq!(
        catalog.get("first_name").unwrap().section,
        Some(Section::PatientInformation)
    );
}

#[test]
fn test_load_json_store_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let yaml_catalog = TemplateCatalog::from_yaml_str(YAML_STORE).unwrap();
    let json = serde_json::to_string_pretty(yaml_catalog.templates()).unwrap();
    let path = write_store(&dir, "templates.json", &json);

    let catalog = TemplateCatalog::from_path(&path).unwrap();
    assert_eq!(catalog.len(), 3);
    // Same templates, same digest regardless of the store format.
    assert_eq!(catalog.digest(), yaml_catalog.digest());
}

#[test]
fn test_unsupported_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(&dir, "templates.toml", "x = 1");

    let err = TemplateCatalog::from_path(&path).unwrap_err();
    assert!(matches!(err, CatalogError::UnsupportedFormat(ext) if ext == "toml"));
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = TemplateCatalog::from_path(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, CatalogError::IoError(_)));
}

#[test]
fn test_malformed_json_is_json_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_store(&dir, "broken.json", "{ not json");
    let err = TemplateCatalog::from_path(&path).unwrap_err();
    assert!(matches!(err, CatalogError::JsonError(_)));
}

// ---------------------------------------------------------------------------
// Matching against the builtin dictionary
// ---------------------------------------------------------------------------

#[test]
fn test_builtin_employer_never_matches_first_name() {
    let catalog = TemplateCatalog::builtin().unwrap();
    let config = MatchConfig::default();
    let matcher = TemplateMatcher::new(&catalog, &config);

    let outcome = matcher.match_label("Name of Employer");
    assert_eq!(outcome.template.unwrap().canonical_key, "employer");

    // Even with the employer template gone, first_name stays vetoed.
    let without_employer: Vec<_> = catalog
        .templates()
        .iter()
        .filter(|t| t.canonical_key != "employer")
        .cloned()
        .collect();
    let reduced = TemplateCatalog::from_templates(without_employer).unwrap();
    let matcher = TemplateMatcher::new(&reduced, &config);
    let outcome = matcher.match_label("Name of Employer");
    assert_ne!(
        outcome.template.map(|t| t.canonical_key.as_str()),
        Some("first_name")
    );
}

#[test]
fn test_builtin_common_labels() {
    let catalog = TemplateCatalog::builtin().unwrap();
    let config = MatchConfig::default();
    let matcher = TemplateMatcher::new(&catalog, &config);

    for (label, key) in [
        ("Marital Status", "marital_status"),
        ("Gender", "gender"),
        ("Sex", "gender"),
        ("E-mail", "email"),
        ("Zip Code", "zip"),
        ("Social Security #", "ssn"),
        ("Patient Signature", "signature"),
    ] {
        let outcome = matcher.match_label(label);
        assert_eq!(
            outcome.template.map(|t| t.canonical_key.as_str()),
            Some(key),
            "label {label:?}"
        );
    }
}

#[test]
fn test_custom_negative_rule_from_config() {
    let catalog = TemplateCatalog::from_yaml_str(YAML_STORE).unwrap();
    let config = MatchConfig {
        negative_rules: vec![NegativeRule::new(&["spouse"], &["tobacco_use"])],
        ..MatchConfig::default()
    };
    let matcher = TemplateMatcher::new(&catalog, &config);

    let outcome = matcher.match_label("Does your spouse smoke tobacco");
    assert!(!outcome.is_match());

    let outcome = matcher.match_label("Tobacco");
    assert_eq!(outcome.kind, MatchKind::Exact);
}

#[test]
fn test_match_and_merge_round() {
    let catalog = TemplateCatalog::from_yaml_str(YAML_STORE).unwrap();
    let config = MatchConfig::default();
    let matcher = TemplateMatcher::new(&catalog, &config);

    let mut field = Field::new("do_smoke", "Do you smoke?", FieldType::Input);
    let outcome = matcher.match_field(&field);
    let template = outcome.template.unwrap();
    let previous = apply_template(&mut field, template);

    assert_eq!(previous.as_deref(), Some("do_smoke"));
    assert_eq!(field.key, "tobacco_use");
    assert_eq!(field.field_type, FieldType::Radio);
    assert_eq!(field.control, template.default_control);
    assert_ne!(field.control, Control::default());
}
