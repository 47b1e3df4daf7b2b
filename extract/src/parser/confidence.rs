//! Confidence scoring and quality tiering.

use form_schema_core::Field;

use crate::report::QualityTier;

/// Minimum confidence score (0.7) for a field to count as high-confidence.
pub const HIGH_CONFIDENCE_THRESHOLD: f64 = 0.7;

/// Minimum confidence score (0.5) for a field to count as medium-confidence.
pub const MEDIUM_CONFIDENCE_THRESHOLD: f64 = 0.5;

pub(crate) const SLASH_CONFIDENCE: f64 = 0.8;
pub(crate) const KNOWN_LABEL_CONFIDENCE: f64 = 0.85;
pub(crate) const INLINE_OPTION_CONFIDENCE: f64 = 0.8;
pub(crate) const CHECKBOX_ROW_CONFIDENCE: f64 = 0.9;
pub(crate) const EXPLANATION_CONFIDENCE: f64 = 0.85;
pub(crate) const FILL_IN_CONFIDENCE: f64 = 0.85;
pub(crate) const GRID_CONFIDENCE: f64 = 0.75;
pub(crate) const CONDITION_BLOCK_CONFIDENCE: f64 = 0.8;
pub(crate) const TERMS_CONFIDENCE: f64 = 0.7;
pub(crate) const FALLBACK_CONFIDENCE: f64 = 0.5;

/// Mean confidence over `fields`, 0 for an empty list.
pub fn mean_confidence(fields: &[Field]) -> f64 {
    if fields.is_empty() {
        return 0.0;
    }
    fields.iter().map(|f| f.confidence).sum::<f64>() / fields.len() as f64
}

/// Assigns a quality tier and the reasons behind it.
pub fn quality_tier(field_count: usize, coverage: f64, mean: f64) -> (QualityTier, Vec<String>) {
    if field_count == 0 {
        return (QualityTier::Failed, vec!["No fields extracted".to_string()]);
    }

    let mut reasons = Vec::new();
    if coverage < HIGH_CONFIDENCE_THRESHOLD {
        reasons.push(format!("Line coverage {:.2} below {HIGH_CONFIDENCE_THRESHOLD}", coverage));
    }
    if mean < HIGH_CONFIDENCE_THRESHOLD {
        reasons.push(format!("Mean confidence {:.2} below {HIGH_CONFIDENCE_THRESHOLD}", mean));
    }

    let tier = if coverage >= HIGH_CONFIDENCE_THRESHOLD && mean >= HIGH_CONFIDENCE_THRESHOLD {
        QualityTier::High
    } else if coverage >= MEDIUM_CONFIDENCE_THRESHOLD && mean >= MEDIUM_CONFIDENCE_THRESHOLD {
        QualityTier::Medium
    } else {
        QualityTier::Low
    };

    (tier, reasons)
}
