//! Template matching pass over detected candidates.

use tracing::debug;

use form_schema_catalog::{MatchEvent, MatchKind, TemplateMatcher, apply_template};

use super::ast::FieldCandidate;

/// Counts and events from one templating pass.
#[derive(Debug, Clone, Default)]
pub struct TemplatingStats {
    pub events: Vec<MatchEvent>,
    pub exact: usize,
    pub fuzzy: usize,
    pub novel: usize,
    /// Candidates whose key changed to a canonical key.
    pub renamed: usize,
}

/// Matches every eligible candidate against the catalog and applies the
/// accepted template.
///
/// Terms blocks and conditional follow-ups keep their detected identity.
/// A novel field's confidence is its parse confidence scaled by how close
/// the best template came to the threshold. When a key or section changes,
/// later follow-ups of that field follow it.
pub(crate) fn apply_templates(
    candidates: &mut [FieldCandidate],
    matcher: &TemplateMatcher<'_>,
    threshold: f64,
) -> TemplatingStats {
    let mut stats = TemplatingStats::default();

    for index in 0..candidates.len() {
        let candidate = &mut candidates[index];
        if candidate.is_terms() || candidate.field.conditional_on.is_some() {
            continue;
        }

        let outcome = matcher.match_field(&candidate.field);
        stats.events.push(outcome.to_event(&candidate.field.title));

        let Some(template) = outcome.template else {
            stats.novel += 1;
            let closeness = if threshold > 0.0 {
                (outcome.score / threshold).clamp(0.0, 1.0)
            } else {
                0.0
            };
            candidate.field.confidence = (candidate.field.confidence * closeness).clamp(0.0, 1.0);
            if outcome.kind == MatchKind::NearMiss || outcome.kind == MatchKind::Excluded {
                debug!(
                    title = %candidate.field.title,
                    nearest = outcome.nearest.unwrap_or_default(),
                    score = outcome.score,
                    kind = %outcome.kind,
                    "template not applied"
                );
            }
            continue;
        };

        match outcome.kind {
            MatchKind::Exact => stats.exact += 1,
            _ => stats.fuzzy += 1,
        }
        let original_key = candidate.field.key.clone();
        let original_section = candidate.field.section;
        let previous = apply_template(&mut candidate.field, template);
        candidate.field.confidence = outcome.score.clamp(0.0, 1.0);
        let key = candidate.field.key.clone();
        let section = candidate.field.section;
        if previous.is_none() && section == original_section {
            continue;
        }

        if let Some(previous) = &previous {
            stats.renamed += 1;
            debug!(from = %previous, to = %key, "applied canonical key");
        }
        let old_explanation = format!("{original_key}_explanation");
        for later in &mut candidates[index + 1..] {
            let Some(conditional) = later.field.conditional_on.as_mut() else {
                continue;
            };
            if conditional.key != original_key {
                continue;
            }
            conditional.key = key.clone();
            if later.field.key == old_explanation {
                later.field.key = format!("{key}_explanation");
            }
            // Follow-ups stay in their parent's section.
            if later.field.section == original_section {
                later.field.section = section;
            }
        }
    }

    stats
}
