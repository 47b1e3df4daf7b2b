//! Exact and fuzzy template matching.
//!
//! A candidate label is normalized and looked up exactly first; failing
//! that, it is scored against every alias with a blend of token-set
//! overlap and Jaro-Winkler character similarity. Negative rules veto
//! pairings in both phases.

use std::collections::HashSet;

use rapidfuzz::distance::jaro_winkler;
use serde::{Deserialize, Serialize};
use tracing::debug;

use form_schema_core::{Field, Template, normalize_label};

use crate::config::MatchConfig;
use crate::loader::{AliasEntry, TemplateCatalog};

const JACCARD_WEIGHT: f64 = 0.5;
const COVERAGE_WEIGHT: f64 = 0.3;
const JARO_WINKLER_WEIGHT: f64 = 0.2;

/// How a candidate related to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Normalized label equals a canonical key or alias.
    Exact,
    /// Fuzzy score cleared the threshold.
    Fuzzy,
    /// Best score fell just short of the threshold.
    NearMiss,
    /// The best pairing was vetoed by a negative rule.
    Excluded,
    /// Nothing came close.
    Miss,
}

impl std::fmt::Display for MatchKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Exact => "exact",
            Self::Fuzzy => "fuzzy",
            Self::NearMiss => "near_miss",
            Self::Excluded => "excluded",
            Self::Miss => "miss",
        };
        f.write_str(label)
    }
}

/// Diagnostic record of one matching attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    /// Candidate title as detected.
    pub candidate: String,
    pub kind: MatchKind,
    /// Canonical key of the accepted, nearest, or vetoed template.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    pub score: f64,
}

/// Result of matching one candidate.
#[derive(Debug, Clone)]
pub struct MatchOutcome<'a> {
    /// The accepted template (exact or fuzzy), if any.
    pub template: Option<&'a Template>,
    /// 1.0 for exact matches, the fuzzy score otherwise. For misses this is
    /// the best sub-threshold score, or 0 when nothing scored.
    pub score: f64,
    pub kind: MatchKind,
    /// Canonical key of the nearest template, accepted or not.
    pub nearest: Option<&'a str>,
}

impl MatchOutcome<'_> {
    /// Returns `true` when a template was accepted.
    pub fn is_match(&self) -> bool {
        self.template.is_some()
    }

    /// Converts the outcome into a report event for `candidate`.
    pub fn to_event(&self, candidate: &str) -> MatchEvent {
        MatchEvent {
            candidate: candidate.to_string(),
            kind: self.kind,
            template: self.nearest.map(str::to_string),
            score: self.score,
        }
    }
}

/// Matches candidate fields against a [`TemplateCatalog`].
///
/// Borrowing both the catalog and the configuration, the matcher is cheap
/// to construct and shares nothing mutable, so one matcher per worker (or
/// one shared across workers) behaves identically.
///
/// # Examples
///
/// ```
/// use form_schema_catalog::{MatchConfig, MatchKind, TemplateCatalog, TemplateMatcher};
/// use form_schema_core::{FieldType, Template};
///
/// let catalog = TemplateCatalog::from_templates(vec![
///     Template::new("first_name", FieldType::Input).with_aliases(&["first name", "name"]),
///     Template::new("employer", FieldType::Input).with_aliases(&["employer"]),
/// ])
/// .unwrap();
/// let config = MatchConfig::default();
/// let matcher = TemplateMatcher::new(&catalog, &config);
///
/// let outcome = matcher.match_label("First Name:");
/// assert_eq!(outcome.kind, MatchKind::Exact);
///
/// let outcome = matcher.match_label("Name of Employer");
/// assert_ne!(outcome.template.map(|t| t.canonical_key.as_str()), Some("first_name"));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct TemplateMatcher<'a> {
    catalog: &'a TemplateCatalog,
    config: &'a MatchConfig,
}

impl<'a> TemplateMatcher<'a> {
    pub fn new(catalog: &'a TemplateCatalog, config: &'a MatchConfig) -> Self {
        Self { catalog, config }
    }

    /// Matches a free-text label.
    pub fn match_label(&self, label: &str) -> MatchOutcome<'a> {
        let normalized = normalize_label(label);
        self.match_normalized(&[normalized.as_str()])
    }

    /// Matches a candidate field by title, then by key.
    pub fn match_field(&self, field: &Field) -> MatchOutcome<'a> {
        let title = normalize_label(&field.title);
        let key = normalize_label(&field.key);
        if key.is_empty() || key == title {
            self.match_normalized(&[title.as_str()])
        } else {
            self.match_normalized(&[title.as_str(), key.as_str()])
        }
    }

    fn is_excluded(&self, candidates: &[&str], canonical_key: &str) -> bool {
        candidates
            .iter()
            .any(|c| self.config.is_excluded(c, canonical_key))
    }

    fn match_normalized(&self, candidates: &[&str]) -> MatchOutcome<'a> {
        let mut vetoed: Option<(usize, f64)> = None;

        for candidate in candidates.iter().filter(|c| !c.is_empty()) {
            let Some(idx) = self.catalog.exact_index(candidate) else {
                continue;
            };
            let template = self.catalog.template(idx);
            if self.is_excluded(candidates, &template.canonical_key) {
                debug!(candidate, template = %template.canonical_key, "exact match vetoed");
                vetoed.get_or_insert((idx, 1.0));
                continue;
            }
            return MatchOutcome {
                template: Some(template),
                score: 1.0,
                kind: MatchKind::Exact,
                nearest: Some(&template.canonical_key),
            };
        }

        let mut best: Option<(usize, f64)> = None;
        for candidate in candidates.iter().filter(|c| !c.is_empty()) {
            let tokens: HashSet<&str> = candidate.split_whitespace().collect();
            for alias in self.catalog.alias_entries() {
                let score = score_alias(candidate, &tokens, alias);
                let template = self.catalog.template(alias.template);
                if self.is_excluded(candidates, &template.canonical_key) {
                    if score >= self.config.threshold && vetoed.is_none_or(|(_, s)| score > s) {
                        vetoed = Some((alias.template, score));
                    }
                    continue;
                }
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((alias.template, score));
                }
            }
        }

        if let Some((idx, score)) = best
            && score >= self.config.threshold
        {
            let template = self.catalog.template(idx);
            return MatchOutcome {
                template: Some(template),
                score,
                kind: MatchKind::Fuzzy,
                nearest: Some(&template.canonical_key),
            };
        }

        let best_score = best.map_or(0.0, |(_, s)| s);
        if let Some((idx, _)) = vetoed {
            return MatchOutcome {
                template: None,
                score: best_score,
                kind: MatchKind::Excluded,
                nearest: Some(&self.catalog.template(idx).canonical_key),
            };
        }

        let kind = if best.is_some()
            && best_score >= self.config.threshold - self.config.near_miss_margin
        {
            MatchKind::NearMiss
        } else {
            MatchKind::Miss
        };
        MatchOutcome {
            template: None,
            score: best_score,
            kind,
            nearest: best.map(|(idx, _)| self.catalog.template(idx).canonical_key.as_str()),
        }
    }
}

fn score_alias(candidate: &str, tokens: &HashSet<&str>, alias: &AliasEntry) -> f64 {
    if tokens.is_empty() || alias.tokens.is_empty() {
        return 0.0;
    }
    let shared = alias
        .tokens
        .iter()
        .filter(|t| tokens.contains(t.as_str()))
        .count() as f64;
    let union = (tokens.len() + alias.tokens.len()) as f64 - shared;
    let jaccard = shared / union;
    let coverage = shared / alias.tokens.len() as f64;
    let chars = jaro_winkler::similarity(candidate.chars(), alias.text.chars());

    JACCARD_WEIGHT * jaccard + COVERAGE_WEIGHT * coverage + JARO_WINKLER_WEIGHT * chars
}

/// Scores two labels the way the matcher scores a candidate against one
/// alias. Both are normalized first.
///
/// # Examples
///
/// ```
/// use form_schema_catalog::label_similarity;
///
/// assert_eq!(label_similarity("Date of Birth", "date_of_birth"), 1.0);
/// assert!(label_similarity("Birth Date", "date of birth") > 0.5);
/// assert!(label_similarity("Allergies", "zip code") < 0.3);
/// ```
pub fn label_similarity(candidate: &str, alias: &str) -> f64 {
    let candidate = normalize_label(candidate);
    let alias = normalize_label(alias);
    let entry = AliasEntry {
        template: 0,
        tokens: alias.split_whitespace().map(str::to_string).collect(),
        text: alias,
    };
    let tokens: HashSet<&str> = candidate.split_whitespace().collect();
    score_alias(&candidate, &tokens, &entry)
}
