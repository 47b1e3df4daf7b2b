use form_schema_catalog::{MatchConfig, MatchKind, TemplateCatalog, TemplateMatcher};
use form_schema_core::{
    Control, Field, FieldType, InputKind, Section, Template, slugify, validate_fields,
};
use form_schema_extract::{
    EmissionMode, ExtractConfig, FormExtractor, extract_fields, normalize_lines,
};

fn builtin() -> TemplateCatalog {
    TemplateCatalog::builtin().unwrap()
}

fn extract(lines: &[&str]) -> Vec<Field> {
    extract_fields(lines, &builtin(), &ExtractConfig::default()).unwrap()
}

fn find<'a>(fields: &'a [Field], key: &str) -> &'a Field {
    fields
        .iter()
        .find(|f| f.key == key)
        .unwrap_or_else(|| panic!("no field {key} in {:?}", keys(fields)))
}

fn keys(fields: &[Field]) -> Vec<&str> {
    fields.iter().map(|f| f.key.as_str()).collect()
}

/// Left-aligns each cell in a 20-column slot.
fn cells(cells: &[&str]) -> String {
    cells
        .iter()
        .map(|cell| format!("{cell:<20}"))
        .collect::<String>()
        .trim_end()
        .to_string()
}

// ---------------------------------------------------------------------------
// Checkbox rows
// ---------------------------------------------------------------------------

#[test]
fn test_gender_and_marital_status_on_one_line() {
    let fields = extract(&["Gender: [ ] Male [ ] Female     Marital Status: [ ] Married [ ] Single"]);

    assert_eq!(fields.len(), 2);
    let gender = find(&fields, "gender");
    assert_eq!(gender.field_type, FieldType::Radio);
    assert_eq!(gender.control.option_names(), vec!["Male", "Female"]);

    let marital = find(&fields, "marital_status");
    assert_eq!(marital.field_type, FieldType::Dropdown);
    assert_eq!(marital.control.option_names(), vec!["Married", "Single"]);
    assert_eq!(keys(&fields), vec!["gender", "marital_status"]);
}

#[test]
fn test_physician_care_question_with_explanation() {
    let fields = extract(&[
        "Are you under a physician's care now? [ ] Yes [ ] No  If yes, please explain:",
    ]);

    assert_eq!(fields.len(), 2);
    let parent = &fields[0];
    assert_eq!(parent.key, "physician_care_now");
    assert_eq!(parent.field_type, FieldType::Radio);
    assert_eq!(parent.control.option_names(), vec!["Yes", "No"]);

    let explain = &fields[1];
    assert_eq!(explain.key, "physician_care_now_explanation");
    assert_eq!(explain.field_type, FieldType::Input);
    let condition = explain.conditional_on.as_ref().unwrap();
    assert_eq!(condition.key, "physician_care_now");
    assert_eq!(condition.value, "yes");
}

// ---------------------------------------------------------------------------
// Compound and multi-label lines
// ---------------------------------------------------------------------------

#[test]
fn test_apt_unit_suite_splits_into_three_inputs() {
    let fields = extract(&["Apt/Unit/Suite________"]);

    assert_eq!(keys(&fields), vec!["apt", "unit", "suite"]);
    assert!(fields.iter().all(|f| f.field_type == FieldType::Input));
}

#[test]
fn test_known_label_split_conserves_labels() {
    let extractor = FormExtractor::new(ExtractConfig::default()).unwrap();
    let lines = [
        "First ____________    MI ___    Last ______________",
        "City ____________    State ____    Zip ________",
        "Home Phone ____________    Cell Phone ____________    Email ________________",
        "Birthdate ________    Age ____    Sex ____    Occupation ______________",
    ];

    for line in lines {
        let detection = extractor.detect(&normalize_lines(&[line]));
        let titles: Vec<&str> = detection
            .candidates
            .iter()
            .map(|c| c.field.title.as_str())
            .collect();
        let labels: Vec<&str> = line
            .split('_')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        assert_eq!(titles, labels, "line: {line}");

        // Titles appear in the line in order.
        let mut cursor = 0;
        for title in &titles {
            let found = line[cursor..].find(title).expect("title is a substring");
            cursor += found + title.len();
        }
    }
}

// ---------------------------------------------------------------------------
// Grids
// ---------------------------------------------------------------------------

fn smile_grid() -> Vec<String> {
    vec![
        "Would you like to change anything about your smile?".to_string(),
        cells(&["Appearance", "Function", "Habits", "Previous Comfort Options"]),
        cells(&["[ ] Whiter teeth", "[ ] Chewing", "[ ] Grinding", "[ ] Nitrous oxide"]),
        cells(&["[ ] Straighter", "[ ] Sensitivity", "[ ] Clenching", "[ ] Headphones"]),
        cells(&["[ ] Fill gaps", "[ ] Bite", "[ ] Nail biting", "[ ] Blanket"]),
        cells(&["[ ] Replace teeth", "[ ] Sensitivity", "[ ] Smoking", "[ ] Pillow"]),
        cells(&["[ ] Cosmetic", "[ ] Jaw pain", "[ ] Whiter teeth", "[ ] Music"]),
    ]
}

fn grid_fields(mode: EmissionMode) -> Vec<Field> {
    let config = ExtractConfig {
        category_header_emission_mode: mode,
        ..ExtractConfig::default()
    };
    let lines = smile_grid();
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    extract_fields(&lines, &builtin(), &config).unwrap()
}

fn assert_unique_options(names: &[&str]) {
    let mut sorted: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
    sorted.sort();
    let total = sorted.len();
    sorted.dedup();
    assert_eq!(sorted.len(), total, "duplicate options in {names:?}");
}

#[test]
fn test_grid_emits_one_field_per_category() {
    let fields = grid_fields(EmissionMode::PerCategoryField);
    let grid: Vec<&Field> = fields
        .iter()
        .filter(|f| f.title.ends_with(" - please mark any that apply"))
        .collect();

    assert_eq!(grid.len(), 4);
    assert_eq!(
        grid.iter().map(|f| f.key.as_str()).collect::<Vec<_>>(),
        vec!["appearance", "function", "habits", "previous_comfort_options"]
    );
    assert!(grid.iter().all(|f| f.field_type == FieldType::Dropdown));
    assert!(grid.iter().all(|f| f.control.multi == Some(true)));

    let all: Vec<&str> = grid.iter().flat_map(|f| f.control.option_names()).collect();
    assert_unique_options(&all);
    assert_eq!(all.len(), 18);
    assert_eq!(
        grid[3].control.option_names(),
        vec!["Nitrous oxide", "Headphones", "Blanket", "Pillow", "Music"]
    );
    // The intro prompt became no separate field in this mode.
    assert!(!fields.iter().any(|f| f.title.starts_with("Would you like")));
}

#[test]
fn test_grid_emits_prefixed_single_field() {
    let fields = grid_fields(EmissionMode::PrefixedSingleField);

    assert_eq!(fields.len(), 1);
    let grid = &fields[0];
    assert_eq!(grid.title, "Would you like to change anything about your smile?");
    assert_eq!(grid.control.multi, Some(true));

    let names = grid.control.option_names();
    assert_unique_options(&names);
    assert_eq!(names.len(), 18);
    assert_eq!(names[0], "Appearance - Whiter teeth");
    assert!(names.contains(&"Previous Comfort Options - Music"));
    assert!(names.iter().all(|n| n.contains(" - ")));
}

#[test]
fn test_sparse_grid_rows_form_one_field() {
    let lines = [
        cells(&["[ ] Morning", "[ ] Midday", "[ ] Evening"]),
        cells(&["[ ] Weekdays", "", "[ ] Weekends"]),
        cells(&["", "[ ] Holidays", ""]),
    ];
    let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
    let fields = extract(&lines);

    assert_eq!(fields.len(), 1, "{:?}", keys(&fields));
    let grid = &fields[0];
    assert_eq!(grid.title, "Please mark any that apply");
    assert_eq!(grid.field_type, FieldType::Dropdown);
    assert_eq!(grid.control.multi, Some(true));
    assert_eq!(
        grid.control.option_names(),
        vec!["Morning", "Midday", "Evening", "Weekdays", "Weekends", "Holidays"]
    );
}

// ---------------------------------------------------------------------------
// Template matching
// ---------------------------------------------------------------------------

#[test]
fn test_name_of_employer_never_matches_first_name() {
    let catalog = TemplateCatalog::from_templates(vec![
        Template::new("first_name", FieldType::Input)
            .with_aliases(&["first name", "name", "name of employer"])
            .with_control(Control::input(InputKind::Text)),
    ])
    .unwrap();
    let config = MatchConfig::default();
    let matcher = TemplateMatcher::new(&catalog, &config);

    let outcome = matcher.match_label("Name of Employer");
    assert!(outcome.template.is_none());
    assert_eq!(outcome.kind, MatchKind::Excluded);

    let fields = extract_fields(&["Name of Employer: ______________"], &catalog, &ExtractConfig::default())
        .unwrap();
    assert_eq!(fields.len(), 1);
    assert_ne!(fields[0].key, "first_name");
}

#[test]
fn test_name_of_employer_uses_employer_template() {
    let fields = extract(&["Name of Employer: ______________"]);
    assert_eq!(keys(&fields), vec!["employer"]);
}

#[test]
fn test_matching_is_deterministic() {
    let catalog = builtin();
    let config = MatchConfig::default();
    let matcher = TemplateMatcher::new(&catalog, &config);
    let labels = [
        "Patient's First Name",
        "Home Tel",
        "Date of last dental visit",
        "Insured's Date of Birth",
        "Favorite color",
    ];

    for label in labels {
        let first = matcher.match_label(label).to_event(label);
        for _ in 0..5 {
            assert_eq!(matcher.match_label(label).to_event(label), first);
        }
    }

    let document = smile_grid();
    let lines: Vec<&str> = document.iter().map(String::as_str).collect();
    let a = extract_fields(&lines, &catalog, &ExtractConfig::default()).unwrap();
    let b = extract_fields(&lines, &catalog, &ExtractConfig::default()).unwrap();
    assert_eq!(a, b);
}

// ---------------------------------------------------------------------------
// Whole documents
// ---------------------------------------------------------------------------

const REGISTRATION: &str = "\
PATIENT REGISTRATION
First Name ______________    MI ___    Last Name ________________
Address ______________________________    Apt/Unit/Suite________
City ____________    State ____    Zip ________
Home Phone ____________    Cell Phone ____________
Sex: [ ] Male [ ] Female     Marital Status: [ ] Single [ ] Married [ ] Divorced

EMERGENCY CONTACT
Name ______________________    Relationship ____________
Home Phone ____________

INSURANCE INFORMATION
Insured's Name ____________________    Insured's Date of Birth ________
Name of Employer ____________________

MEDICAL HISTORY
Are you under a physician's care now? [ ] Yes [ ] No  If yes, please explain: ____________
Are you taking any medications? [ ] Yes [ ] No  If yes, please explain: ____________
Do you have any of the following?
Heart disease      Diabetes      Asthma
High blood pressure      Hepatitis      Arthritis


CONSENT
I authorize the release of any information necessary to process my insurance claims.
I understand that I am responsible for all charges regardless of insurance coverage.
Signature ________________________    Date __________
";

#[test]
fn test_registration_form_invariants() {
    let lines: Vec<&str> = REGISTRATION.lines().collect();
    let fields = extract(&lines);

    assert!(validate_fields(&fields).is_empty(), "{:?}", validate_fields(&fields));
    assert!(fields.iter().all(|f| (0.0..=1.0).contains(&f.confidence)));
    assert!(
        fields
            .iter()
            .filter(|f| f.field_type.is_choice())
            .all(|f| !f.control.options.is_empty())
    );

    let gender = find(&fields, "gender");
    assert_eq!(gender.section, Section::PatientInformation);

    let conditions = find(&fields, "medical_conditions");
    assert_eq!(conditions.section, Section::MedicalHistory);
    assert_eq!(conditions.control.options.len(), 6);

    let explanations: Vec<&Field> = fields
        .iter()
        .filter(|f| f.key.ends_with("_explanation"))
        .collect();
    assert_eq!(explanations.len(), 2);
    for explanation in explanations {
        let parent = &explanation.conditional_on.as_ref().unwrap().key;
        let parent_index = fields.iter().position(|f| &f.key == parent).unwrap();
        let own_index = fields.iter().position(|f| f.key == explanation.key).unwrap();
        assert!(parent_index < own_index);
    }

    assert!(fields.iter().any(|f| f.field_type == FieldType::Terms));
    assert!(!fields.iter().any(|f| f.key == "first_name" && f.title.contains("Employer")));
}

#[test]
fn test_repeated_labels_get_unique_keys() {
    let lines: Vec<&str> = REGISTRATION.lines().collect();
    let fields = extract(&lines);

    let mut all = keys(&fields);
    let total = all.len();
    all.sort_unstable();
    all.dedup();
    assert_eq!(all.len(), total);

    // "Home Phone" appears under patient information and emergency contact.
    let phones: Vec<&Field> = fields
        .iter()
        .filter(|f| f.key.starts_with("home_phone"))
        .collect();
    assert_eq!(phones.len(), 2);
    assert!(phones[1].key.starts_with("home_phone_"));
    assert!(phones[1].confidence < phones[0].confidence);
}

#[test]
fn test_generated_keys_are_idempotent() {
    let fields = extract(&REGISTRATION.lines().collect::<Vec<_>>());
    for field in &fields {
        assert_eq!(slugify(&field.key), field.key);
        assert_eq!(slugify(&slugify(&field.title)), slugify(&field.title));
    }
}

#[test]
fn test_empty_and_blank_documents() {
    let empty: [&str; 0] = [];
    assert!(extract(&empty).is_empty());
    assert!(extract(&["", "   ", "\t"]).is_empty());
}
