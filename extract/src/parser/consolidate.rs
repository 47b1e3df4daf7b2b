//! Document-level consolidation of templated candidates.
//!
//! Runs once per document after template matching, in a fixed order:
//! duplicate merge, section inference, condition consolidation, key
//! uniqueness, dangling-reference cleanup and the option-less downgrade.
//! The output satisfies the field-list invariants (unique keys, no
//! option-less choice fields, no dangling conditionals, no duplicate
//! option names within a field).

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use form_schema_core::{Control, Field, FieldOption, FieldType, Section, normalize_label};

use super::ast::FieldCandidate;
use super::confidence::CONDITION_BLOCK_CONFIDENCE;
use super::patterns::{PatternSet, is_yes_no};
use crate::config::ExtractConfig;

const CONDITIONS_TITLE: &str = "Do you have any of the following?";
const MAX_CONDITION_OPTIONS: usize = 8;

/// What consolidation changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsolidationStats {
    pub merged: usize,
    pub sections_inferred: usize,
    pub condition_fields_merged: usize,
    pub suffixed: usize,
    pub dangling_removed: usize,
    pub downgraded: usize,
}

/// Consolidates candidates into the final field list.
pub(crate) fn consolidate(
    candidates: Vec<FieldCandidate>,
    config: &ExtractConfig,
    patterns: &PatternSet,
) -> (Vec<Field>, ConsolidationStats) {
    let mut stats = ConsolidationStats::default();

    let mut merged = merge_duplicates(candidates, &mut stats);
    infer_sections(&mut merged, config, patterns, &mut stats);
    for section in [Section::MedicalHistory, Section::DentalHistory] {
        merged = consolidate_conditions(merged, section, patterns, &mut stats);
    }

    let mut fields: Vec<Field> = merged.into_iter().map(FieldCandidate::into_field).collect();
    enforce_unique_keys(&mut fields, config.key_collision_penalty, &mut stats);
    strip_dangling(&mut fields, &mut stats);
    for field in &mut fields {
        dedupe_options(&mut field.control.options);
        if field.downgrade_if_optionless() {
            stats.downgraded += 1;
        }
    }

    debug!(
        fields = fields.len(),
        merged = stats.merged,
        suffixed = stats.suffixed,
        "consolidated document"
    );
    (fields, stats)
}

fn types_compatible(a: FieldType, b: FieldType) -> bool {
    a == b || (a.is_choice() && b.is_choice())
}

fn sections_compatible(a: Section, b: Section) -> bool {
    a == b || a == Section::General || b == Section::General
}

fn is_duplicate(existing: &FieldCandidate, incoming: &FieldCandidate) -> bool {
    let (a, b) = (&existing.field, &incoming.field);
    if !types_compatible(a.field_type, b.field_type) || !sections_compatible(a.section, b.section) {
        return false;
    }
    match (&a.conditional_on, &b.conditional_on) {
        (Some(_), Some(_)) => {
            a.key == b.key && normalize_label(&a.title) == normalize_label(&b.title)
        }
        (None, None) => {
            a.key == b.key
                || (a.section == b.section && normalize_label(&a.title) == normalize_label(&b.title))
        }
        _ => false,
    }
}

fn union_options(target: &mut Vec<FieldOption>, extra: impl IntoIterator<Item = FieldOption>) {
    let mut seen: HashSet<String> = target.iter().map(|o| normalize_label(&o.name)).collect();
    for option in extra {
        if seen.insert(normalize_label(&option.name)) {
            target.push(option);
        }
    }
}

fn dedupe_options(options: &mut Vec<FieldOption>) {
    let mut seen = HashSet::new();
    options.retain(|option| seen.insert(normalize_label(&option.name)));
}

fn merge_into(existing: &mut FieldCandidate, incoming: FieldCandidate) {
    let target = &mut existing.field;
    let other = incoming.field;

    if other.section.specificity() > target.section.specificity() {
        target.section = other.section;
    }
    if target.field_type == FieldType::Terms {
        let joined = [target.control.text.take(), other.control.text]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join("\n");
        target.control.text = Some(joined);
    } else if target.field_type.is_choice() {
        if target.field_type != other.field_type && other.control.multi == Some(true) {
            target.field_type = FieldType::Dropdown;
            target.control.multi = Some(true);
        }
        union_options(&mut target.control.options, other.control.options);
    }
    target.confidence = target.confidence.max(other.confidence);
    existing.grid_derived |= incoming.grid_derived;
}

fn merge_duplicates(candidates: Vec<FieldCandidate>, stats: &mut ConsolidationStats) -> Vec<FieldCandidate> {
    let mut out: Vec<FieldCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match out.iter().position(|existing| is_duplicate(existing, &candidate)) {
            Some(index) => {
                debug!(key = %candidate.field.key, "merged duplicate field");
                merge_into(&mut out[index], candidate);
                stats.merged += 1;
            }
            None => out.push(candidate),
        }
    }
    out
}

fn infer_sections(
    candidates: &mut [FieldCandidate],
    config: &ExtractConfig,
    patterns: &PatternSet,
    stats: &mut ConsolidationStats,
) {
    for candidate in candidates.iter_mut().filter(|c| c.field.section == Section::General) {
        let field = &mut candidate.field;
        let mut text = field.title.clone();
        for option in &field.control.options {
            text.push(' ');
            text.push_str(&option.name);
        }
        if let Some(section) = patterns.infer_section(&text, config.section_min_keyword_hits) {
            field.section = section;
            stats.sections_inferred += 1;
        }
    }
}

fn conditions_key(section: Section) -> &'static str {
    if section == Section::DentalHistory {
        "dental_conditions"
    } else {
        "medical_conditions"
    }
}

fn is_condition_candidate(
    candidate: &FieldCandidate,
    section: Section,
    parents: &HashSet<&str>,
    patterns: &PatternSet,
) -> bool {
    let field = &candidate.field;
    let options = &field.control.options;
    if field.section != section
        || candidate.grid_derived
        || field.conditional_on.is_some()
        || !field.field_type.is_choice()
        || options.is_empty()
        || options.len() > MAX_CONDITION_OPTIONS
        || field.key == conditions_key(section)
        || parents.contains(field.key.as_str())
        || options.iter().all(|o| is_yes_no(&o.name))
    {
        return false;
    }
    let hits = options
        .iter()
        .filter(|o| patterns.has_condition_keyword(&o.name))
        .count();
    hits * 2 >= options.len()
}

/// Folds scattered condition checkboxes in one history section into a
/// single multi-select field.
fn consolidate_conditions(
    candidates: Vec<FieldCandidate>,
    section: Section,
    patterns: &PatternSet,
    stats: &mut ConsolidationStats,
) -> Vec<FieldCandidate> {
    let key = conditions_key(section);
    let matches: Vec<usize> = {
        let parents: HashSet<&str> = candidates
            .iter()
            .filter_map(|c| c.field.conditional_on.as_ref().map(|cond| cond.key.as_str()))
            .collect();
        candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| is_condition_candidate(c, section, &parents, patterns))
            .map(|(index, _)| index)
            .collect()
    };
    let target = candidates.iter().position(|c| c.field.key == key);
    if matches.is_empty() || (target.is_none() && matches.len() < 2) {
        return candidates;
    }

    let mut options: Vec<FieldOption> = Vec::new();
    for index in &matches {
        union_options(&mut options, candidates[*index].field.control.options.clone());
    }
    stats.condition_fields_merged += matches.len();
    debug!(section = %section, count = matches.len(), "consolidated condition fields");

    let replace_at = target.unwrap_or(matches[0]);
    let mut out = Vec::with_capacity(candidates.len());
    for (index, mut candidate) in candidates.into_iter().enumerate() {
        if index == replace_at {
            if target.is_some() {
                union_options(&mut candidate.field.control.options, options.clone());
            } else {
                let field = Field::new(key, CONDITIONS_TITLE, FieldType::Dropdown)
                    .with_section(section)
                    .with_control(Control {
                        options: options.clone(),
                        multi: Some(true),
                        ..Control::default()
                    })
                    .with_confidence(CONDITION_BLOCK_CONFIDENCE);
                candidate = FieldCandidate::new(field, candidate.source_span, "condition_block").grid_derived();
            }
            out.push(candidate);
        } else if !matches.contains(&index) {
            out.push(candidate);
        }
    }
    out
}

/// Suffixes repeated keys with `_2`, `_3`, ... in document order.
///
/// Conditional references follow the most recent field that carried the
/// referenced key, and `<parent>_explanation` keys follow a renamed parent.
fn enforce_unique_keys(fields: &mut [Field], penalty: f64, stats: &mut ConsolidationStats) {
    let mut used: HashSet<String> = HashSet::new();
    let mut latest: HashMap<String, String> = HashMap::new();

    for field in fields.iter_mut() {
        if let Some(conditional) = field.conditional_on.as_mut()
            && let Some(current) = latest.get(&conditional.key)
            && *current != conditional.key
        {
            let old_explanation = format!("{}_explanation", conditional.key);
            if field.key == old_explanation {
                field.key = format!("{current}_explanation");
            }
            conditional.key = current.clone();
        }

        let base = field.key.clone();
        if used.contains(&base) {
            let mut suffix = 2;
            while used.contains(&format!("{base}_{suffix}")) {
                suffix += 1;
            }
            field.key = format!("{base}_{suffix}");
            field.confidence = (field.confidence - penalty).max(0.0);
            stats.suffixed += 1;
        }
        used.insert(field.key.clone());
        latest.insert(base, field.key.clone());
    }
}

fn strip_dangling(fields: &mut [Field], stats: &mut ConsolidationStats) {
    let keys: HashSet<String> = fields.iter().map(|f| f.key.clone()).collect();
    for field in fields.iter_mut() {
        let dangling = field
            .conditional_on
            .as_ref()
            .is_some_and(|cond| !keys.contains(&cond.key) || cond.key == field.key);
        if dangling {
            debug!(key = %field.key, "removed dangling conditional");
            field.conditional_on = None;
            stats.dangling_removed += 1;
        }
    }
}
