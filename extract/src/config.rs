//! Extractor configuration.
//!
//! Every tunable threshold and pattern table lives here and is passed into
//! [`FormExtractor::new`](crate::FormExtractor::new); nothing is read from
//! module-level state. Files are YAML (JSON is accepted, being a YAML
//! subset); missing keys take their defaults.
//!
//! # Example YAML
//!
//! ```yaml
//! grid_column_tolerance: 8
//! grid_min_columns: 3
//! multi_field_min_spacing: 4
//! template_match_threshold: 0.85
//! category_header_emission_mode: prefixed_single_field
//! patterns:
//!   known_labels: [First, MI, Last, City, State, Zip]
//! ```

use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use form_schema_catalog::{MatchConfig, NegativeRule, default_negative_rules};
use form_schema_core::Section;

use crate::error::{ExtractError, Result};

/// How a grid with category headers is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmissionMode {
    /// One multi-select field per category column.
    #[default]
    PerCategoryField,
    /// One multi-select field whose options are `"<Category> - <option>"`.
    PrefixedSingleField,
}

/// Heading patterns that switch the current section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionHeading {
    pub section: Section,
    /// Case-insensitive regexes matched against the whole heading text.
    pub patterns: Vec<String>,
}

/// Keywords used to infer a section from free text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionKeywords {
    pub section: Section,
    pub keywords: Vec<String>,
}

/// Pattern and keyword tables driving line classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub section_headings: Vec<SectionHeading>,
    /// Regexes for boilerplate lines (addresses, footers, revision codes).
    pub noise_patterns: Vec<String>,
    /// Labels recognized by the multi-field line splitter.
    pub known_labels: Vec<String>,
    /// Short slash components accepted despite being under two characters.
    pub abbreviations: Vec<String>,
    pub date_keywords: Vec<String>,
    pub signature_keywords: Vec<String>,
    pub phone_keywords: Vec<String>,
    pub email_keywords: Vec<String>,
    pub ssn_keywords: Vec<String>,
    pub zip_keywords: Vec<String>,
    pub number_keywords: Vec<String>,
    /// Regexes for "do you have any of the following" style intros.
    pub condition_intros: Vec<String>,
    /// Regexes for consent statements that start a terms block.
    pub consent_openers: Vec<String>,
    /// Regex for "if yes, please explain" follow-up clauses.
    pub explanation_pattern: String,
    /// Words that mark an option as a medical/dental condition.
    pub condition_keywords: Vec<String>,
    pub section_keywords: Vec<SectionKeywords>,
    /// Literal checkbox glyphs.
    pub checkbox_markers: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            section_headings: vec![
                SectionHeading {
                    section: Section::PatientInformation,
                    patterns: strings(&[
                        r"(new\s+)?patient\s+(registration|information|info|data|demographics|intake)(\s+form)?",
                        r"personal\s+(information|data|details)",
                        r"(patient\s+)?registration(\s+form)?",
                        r"demographics",
                        r"contact\s+information",
                    ]),
                },
                SectionHeading {
                    section: Section::MedicalHistory,
                    patterns: strings(&[
                        r"(patient\s+)?(medical|health)\s+(history|information|questionnaire|record)(\s+form)?",
                        r"medical",
                        r"for\s+women(\s+only)?",
                    ]),
                },
                SectionHeading {
                    section: Section::DentalHistory,
                    patterns: strings(&[
                        r"(patient\s+)?dental\s+(history|information|questionnaire|health|record)(\s+form)?",
                        r"dental",
                    ]),
                },
                SectionHeading {
                    section: Section::Insurance,
                    patterns: strings(&[
                        r"((primary|secondary)\s+)?(dental\s+)?insurance(\s+(information|info|coverage|details))?",
                        r"(primary|secondary)\s+coverage",
                        r"billing(\s+information)?",
                        r"responsible\s+party(\s+information)?",
                    ]),
                },
                SectionHeading {
                    section: Section::EmergencyContact,
                    patterns: strings(&[
                        r"emergency(\s+contact)?(\s+information)?",
                        r"in\s+case\s+of\s+emergency",
                    ]),
                },
                SectionHeading {
                    section: Section::Consent,
                    patterns: strings(&[
                        r"(informed\s+)?consent(\s+form|\s+for\s+treatment|\s+to\s+treat)?",
                        r"authorization(\s+and\s+release)?",
                        r"financial\s+(policy|agreement|responsibility)",
                        r"(hipaa|privacy)\s+(notice|acknowledge?ment|policy|practices)",
                        r"terms(\s+and\s+conditions)?",
                        r"acknowledge?ment(\s+of\s+receipt)?",
                        r"release\s+of\s+information",
                        r"assignment\s+of\s+benefits",
                    ]),
                },
                SectionHeading {
                    section: Section::Signature,
                    patterns: strings(&[r"signatures", r"signature\s+(page|section)"]),
                },
            ],
            noise_patterns: strings(&[
                r"(?i)(©|\(c\)\s*\d{4}|\bcopyright\b|all\s+rights\s+reserved)",
                r"(?i)^\s*(rev(ision)?\.?|form\s*(no\.?|#)?|version|ver\.?)\s*[:#]?\s*[\w./-]*\d[\w./-]*\s*$",
                r"(?i)\brev(ision)?\.?\s*[:#]?\s*\d{1,2}[/.-]\d{2,4}\s*$",
                r"(?i)^\s*page\s+\d+\s*((of|/)\s*\d+)?\s*$",
                r"(?i)^\s*\d{1,6}\s+([\w.']+\s+){0,5}(street|st|avenue|ave|road|rd|boulevard|blvd|drive|dr|lane|ln|way|court|ct|place|pl|parkway|pkwy|highway|hwy|suite|ste)\b\.?\s*(,|#|\d|$)",
                r"(?i)^([\s|•·,;:/().+-]|\b(tel|phone|ph|fax|p|f|t|e|email|e-mail|web|website|office|cell)\b\.?)*([\w.+-]+@[\w-]+(\.[\w-]+)+|(https?://)?(www\.)?[\w-]+(\.[\w-]+)*\.(com|net|org|dental|care|us|biz)(/\S*)?|\+?1?[\s.-]?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4})([\s|•·,;:/().+-]|\b(tel|phone|ph|fax|p|f|t|e|email|e-mail|web|website|office|cell)\b\.?|[\w.+-]+@[\w-]+(\.[\w-]+)+|(https?://)?(www\.)?[\w-]+(\.[\w-]+)*\.(com|net|org|dental|care|us|biz)(/\S*)?|\+?1?[\s.-]?\(?\d{3}\)?[\s.-]?\d{3}[\s.-]?\d{4})*$",
                r"^[^•·|]{2,40}(\s*[•·|]\s*[^•·|]{2,40}){2,}$",
                r"(?i)^\s*(office\s+use\s+only|for\s+office\s+use)\b",
            ]),
            known_labels: strings(&[
                "First",
                "First Name",
                "MI",
                "M.I.",
                "Middle",
                "Middle Initial",
                "Last",
                "Last Name",
                "Name",
                "Nickname",
                "Preferred Name",
                "Address",
                "Street",
                "Street Address",
                "Apt",
                "Apt #",
                "Unit",
                "Suite",
                "City",
                "State",
                "Zip",
                "Zip Code",
                "County",
                "Home",
                "Home Phone",
                "Work",
                "Work Phone",
                "Cell",
                "Cell Phone",
                "Mobile",
                "Phone",
                "Ext",
                "Fax",
                "Email",
                "E-mail",
                "Birthdate",
                "Birth Date",
                "Date of Birth",
                "DOB",
                "Age",
                "Sex",
                "Gender",
                "SSN",
                "SS#",
                "Social Security #",
                "Occupation",
                "Employer",
                "Date",
                "Relationship",
                "Group #",
                "Group Number",
                "ID #",
                "Member ID",
                "Policy #",
                "Height",
                "Weight",
                "Initials",
            ]),
            abbreviations: strings(&["MI", "M.I.", "Apt", "St", "Ste", "No", "#", "Ext", "Jr", "Sr"]),
            date_keywords: strings(&[
                "date", "dob", "birth", "birthdate", "birthday", "mm/dd", "mm/dd/yy", "mm/dd/yyyy",
            ]),
            signature_keywords: strings(&["signature", "sign here", "signed by", "signature of"]),
            phone_keywords: strings(&["phone", "telephone", "tel", "cell", "mobile", "fax"]),
            email_keywords: strings(&["email", "e-mail", "e mail"]),
            ssn_keywords: strings(&["ssn", "ss#", "social security", "soc sec"]),
            zip_keywords: strings(&["zip", "zip code", "postal code", "zipcode"]),
            number_keywords: strings(&["age", "height", "weight", "number of", "how many"]),
            condition_intros: strings(&[
                r"(?i)\b(do|have|has|are|is)\s+(you|the\s+patient)\b.{0,60}\b(any|one)\s+of\s+the\s+following\b",
                r"(?i)^\s*(please\s+)?(check|mark|circle|indicate)\b.{0,40}\b(conditions?|diseases?|illnesses|problems)\b",
                r"(?i)\bhave\s+you\s+(ever\s+)?had\b.{0,40}\b(following|these)\b",
            ]),
            consent_openers: strings(&[
                r"(?i)^\s*(i|we)\s*(,\s*the\s+undersigned\s*,?)?\s+(hereby\s+)?(authorize|understand|agree|consent|acknowledge|certify|give|have\s+read|grant|request|assign|permit|attest)\b",
                r"(?i)^\s*(by\s+signing|the\s+undersigned|this\s+is\s+to\s+certify)\b",
            ]),
            explanation_pattern: r"(?i)\bif\s+(yes|so|checked)\b.{0,30}\b(explain|describe|list|specify|details?|please|when|what|why|which)\b".to_string(),
            condition_keywords: strings(&[
                "heart", "attack", "failure", "murmur", "disease", "blood", "pressure", "diabetes",
                "asthma", "cancer", "hepatitis", "hiv", "aids", "arthritis", "stroke", "epilepsy",
                "seizure", "seizures", "anemia", "kidney", "liver", "lung", "thyroid", "ulcer",
                "ulcers", "tuberculosis", "tb", "glaucoma", "allergy", "allergies", "bleeding",
                "disorder", "pacemaker", "prosthetic", "joint", "valve", "radiation",
                "chemotherapy", "osteoporosis", "sinus", "emphysema", "bronchitis", "hemophilia",
                "herpes", "jaundice", "lupus", "migraine", "headaches", "fainting", "dizziness",
                "rheumatic", "fever", "sickle", "tumor", "tumors", "std", "psychiatric",
                "depression", "anxiety", "apnea", "alzheimer", "parkinson", "angina", "hiv",
                "gum", "gums", "sensitive", "sensitivity", "grinding", "tmj", "jaw", "clicking",
                "sores", "swelling", "breath", "dry", "mouth", "pain", "teeth",
            ]),
            section_keywords: vec![
                SectionKeywords {
                    section: Section::PatientInformation,
                    keywords: strings(&[
                        "patient", "name", "address", "city", "state", "zip", "birth", "dob",
                        "gender", "sex", "marital", "ssn", "social security", "phone", "email",
                        "occupation", "age", "street", "apt", "registration", "personal",
                    ]),
                },
                SectionKeywords {
                    section: Section::MedicalHistory,
                    keywords: strings(&[
                        "medical", "medication", "medications", "physician", "doctor", "hospital",
                        "hospitalized", "allergy", "allergies", "allergic", "illness", "disease",
                        "surgery", "pregnant", "nursing", "blood", "heart", "diabetes", "asthma",
                        "health", "condition", "conditions", "treatment", "prescribed", "tobacco",
                        "smoke", "alcohol", "drugs", "care", "women",
                    ]),
                },
                SectionKeywords {
                    section: Section::DentalHistory,
                    keywords: strings(&[
                        "dental", "dentist", "teeth", "tooth", "gum", "gums", "floss", "brush",
                        "cleaning", "orthodontic", "braces", "dentures", "jaw", "tmj",
                        "sensitive", "smile", "hygienist", "cavity", "cavities", "x rays",
                        "periodontal", "whitening", "crown", "crowns", "fillings", "root canal",
                        "bite", "grinding", "chewing", "visit",
                    ]),
                },
                SectionKeywords {
                    section: Section::Insurance,
                    keywords: strings(&[
                        "insurance", "insured", "subscriber", "policy", "group", "carrier",
                        "member", "coverage", "plan", "benefits", "claim", "billing", "payment",
                    ]),
                },
                SectionKeywords {
                    section: Section::EmergencyContact,
                    keywords: strings(&["emergency", "contact", "relationship", "relative", "notify"]),
                },
                SectionKeywords {
                    section: Section::Consent,
                    keywords: strings(&[
                        "consent", "authorize", "authorization", "agree", "acknowledge",
                        "understand", "release", "terms", "hipaa", "privacy",
                    ]),
                },
                SectionKeywords {
                    section: Section::Signature,
                    keywords: strings(&["signature", "signed", "sign", "witness"]),
                },
            ],
            checkbox_markers: strings(&[
                "[ ]", "[  ]", "[]", "[x]", "[X]", "[✓]", "[✔]", "☐", "☑", "☒", "□", "■", "▢",
                "❑", "○", "◯",
            ]),
        }
    }
}

/// Top-level extractor configuration.
///
/// # Examples
///
/// ```
/// use form_schema_extract::{EmissionMode, ExtractConfig};
///
/// let config: ExtractConfig = serde_yaml::from_str(
///     "grid_min_columns: 4\ncategory_header_emission_mode: prefixed_single_field\n",
/// )
/// .unwrap();
/// assert_eq!(config.grid_min_columns, 4);
/// assert_eq!(config.grid_column_tolerance, 10);
/// assert_eq!(config.category_header_emission_mode, EmissionMode::PrefixedSingleField);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Max char distance between checkbox markers sharing a grid column.
    pub grid_column_tolerance: usize,
    /// Minimum inferred columns for a block to be parsed as a grid.
    pub grid_min_columns: usize,
    /// Maximum rows collected into one grid block.
    pub grid_max_rows: usize,
    /// Minimum run of spaces separating labels on a multi-field line.
    pub multi_field_min_spacing: usize,
    /// Minimum fuzzy score for a template to be accepted.
    pub template_match_threshold: f64,
    pub category_header_emission_mode: EmissionMode,
    /// Consecutive blank lines that end a collection block.
    pub collection_blank_run: usize,
    /// Consecutive marker-less lines that end a collection block.
    pub collection_idle_limit: usize,
    /// Shorter non-blank lines are dropped.
    pub min_line_length: usize,
    /// Keyword hits needed to move a `General` field into a section.
    pub section_min_keyword_hits: usize,
    /// Confidence subtracted from fields whose key had to be suffixed.
    pub key_collision_penalty: f64,
    pub negative_rules: Vec<NegativeRule>,
    pub patterns: PatternConfig,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            grid_column_tolerance: 10,
            grid_min_columns: 3,
            grid_max_rows: 15,
            multi_field_min_spacing: 4,
            template_match_threshold: form_schema_catalog::DEFAULT_MATCH_THRESHOLD,
            category_header_emission_mode: EmissionMode::default(),
            collection_blank_run: 2,
            collection_idle_limit: 1,
            min_line_length: 3,
            section_min_keyword_hits: 2,
            key_collision_penalty: 0.15,
            negative_rules: default_negative_rules(),
            patterns: PatternConfig::default(),
        }
    }
}

impl ExtractConfig {
    /// Loads and validates configuration from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::IoError`] if the file cannot be read,
    /// [`ExtractError::YamlError`] if parsing fails, or
    /// [`ExtractError::InvalidConfig`] if a value is out of range.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: Self = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.template_match_threshold) {
            return Err(ExtractError::InvalidConfig {
                field: "template_match_threshold",
                reason: format!("{} is outside 0.0-1.0", self.template_match_threshold),
            });
        }
        if !(0.0..=1.0).contains(&self.key_collision_penalty) {
            return Err(ExtractError::InvalidConfig {
                field: "key_collision_penalty",
                reason: format!("{} is outside 0.0-1.0", self.key_collision_penalty),
            });
        }
        if self.grid_min_columns < 2 {
            return Err(ExtractError::InvalidConfig {
                field: "grid_min_columns",
                reason: "a grid needs at least 2 columns".to_string(),
            });
        }
        if self.grid_max_rows < 2 {
            return Err(ExtractError::InvalidConfig {
                field: "grid_max_rows",
                reason: "a grid needs at least 2 rows".to_string(),
            });
        }
        if self.multi_field_min_spacing < 2 {
            return Err(ExtractError::InvalidConfig {
                field: "multi_field_min_spacing",
                reason: "single spaces cannot separate fields".to_string(),
            });
        }
        if self.collection_blank_run == 0 || self.collection_idle_limit == 0 {
            return Err(ExtractError::InvalidConfig {
                field: "collection_blank_run",
                reason: "collection limits must be at least 1".to_string(),
            });
        }
        if self.section_min_keyword_hits == 0 {
            return Err(ExtractError::InvalidConfig {
                field: "section_min_keyword_hits",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.patterns.checkbox_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(ExtractError::InvalidConfig {
                field: "patterns.checkbox_markers",
                reason: "at least one checkbox glyph is required".to_string(),
            });
        }
        Ok(())
    }

    /// Builds the template matcher settings.
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            threshold: self.template_match_threshold,
            negative_rules: self.negative_rules.clone(),
            ..MatchConfig::default()
        }
    }
}
