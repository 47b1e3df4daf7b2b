//! Matching configuration: acceptance threshold and negative rules.
//!
//! # Example YAML
//!
//! ```yaml
//! threshold: 0.8
//! negative_rules:
//!   - when_contains: [employer]
//!     never_match: [first_name, last_name, patient_name]
//! ```

use serde::{Deserialize, Serialize};

use form_schema_core::normalize_label;

/// Default fuzzy acceptance threshold.
pub const DEFAULT_MATCH_THRESHOLD: f64 = 0.8;

/// Excludes a set of templates for candidates mentioning a phrase.
///
/// A rule fires when the normalized candidate contains any
/// `when_contains` phrase as a whole-word sequence. While it fires, none of
/// the `never_match` canonical keys may be selected, exact or fuzzy.
///
/// # Examples
///
/// ```
/// use form_schema_catalog::NegativeRule;
///
/// let rule = NegativeRule::new(&["employer"], &["first_name"]);
/// assert!(rule.excludes("name of employer", "first_name"));
/// assert!(!rule.excludes("first name", "first_name"));
/// assert!(!rule.excludes("employers name", "first_name"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegativeRule {
    pub when_contains: Vec<String>,
    pub never_match: Vec<String>,
}

impl NegativeRule {
    pub fn new(when_contains: &[&str], never_match: &[&str]) -> Self {
        Self {
            when_contains: when_contains.iter().map(|s| s.to_string()).collect(),
            never_match: never_match.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Returns `true` if this rule forbids pairing `normalized_candidate`
    /// with the template `canonical_key`.
    pub fn excludes(&self, normalized_candidate: &str, canonical_key: &str) -> bool {
        if !self.never_match.iter().any(|k| k == canonical_key) {
            return false;
        }
        let padded = format!(" {normalized_candidate} ");
        self.when_contains.iter().any(|phrase| {
            let phrase = normalize_label(phrase);
            !phrase.is_empty() && padded.contains(&format!(" {phrase} "))
        })
    }
}

/// Built-in exclusions keeping third-party names, phones and birth dates
/// (employer, insured, emergency contact, physician, guardian) off the
/// patient's own templates.
pub fn default_negative_rules() -> Vec<NegativeRule> {
    let patient_identity = [
        "first_name",
        "last_name",
        "middle_initial",
        "patient_name",
        "preferred_name",
        "date_of_birth",
        "home_phone",
        "cell_phone",
        "work_phone",
        "email",
        "ssn",
    ];
    vec![
        NegativeRule::new(&["employer", "company", "business"], &patient_identity),
        NegativeRule::new(
            &["insured", "subscriber", "policy holder", "policyholder"],
            &patient_identity,
        ),
        NegativeRule::new(&["emergency", "relative", "friend"], &patient_identity),
        NegativeRule::new(
            &["physician", "doctor", "dentist", "dds", "md", "pharmacy", "referred"],
            &patient_identity,
        ),
        NegativeRule::new(
            &["spouse", "parent", "guardian", "responsible party", "mother", "father"],
            &patient_identity,
        ),
    ]
}

/// Settings for [`TemplateMatcher`](crate::TemplateMatcher).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// Minimum fuzzy score (0.0 to 1.0) for a template to be accepted.
    pub threshold: f64,
    /// Sub-threshold scores at or above `threshold - near_miss_margin` are
    /// reported as near misses.
    pub near_miss_margin: f64,
    pub negative_rules: Vec<NegativeRule>,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MATCH_THRESHOLD,
            near_miss_margin: 0.15,
            negative_rules: default_negative_rules(),
        }
    }
}

impl MatchConfig {
    /// Returns `true` if any negative rule forbids the pairing.
    pub fn is_excluded(&self, normalized_candidate: &str, canonical_key: &str) -> bool {
        self.negative_rules
            .iter()
            .any(|rule| rule.excludes(normalized_candidate, canonical_key))
    }
}
