/// Flood risk estimation for water infrastructure.
///
/// The model is a weighted sum of normalized rainfall and normalized asset
/// age, classified against two fixed thresholds:
///
/// ```text
/// risk_score = 0.6 * (rainfall_mm / 100) + 0.4 * (age_years / 50)
///
///   score < 0.5         → Low       "Monitor only"
///   0.5 <= score < 0.8  → Moderate  "Prepare boil water notice"
///   score >= 0.8        → High      "Issue boil water notice"
/// ```
///
/// Weights, normalizers, and thresholds are the canonical policy and are not
/// read from configuration. Every function here is pure.

use crate::model::{InfrastructureRecord, RiskAssessment, RiskError, RiskLevel};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Model constants
// ---------------------------------------------------------------------------

/// Rainfall (mm) that contributes a full rainfall factor of 1.0.
pub const RAINFALL_NORMALIZER_MM: f64 = 100.0;
/// Asset age (years) that contributes a full age factor of 1.0.
pub const AGE_NORMALIZER_YEARS: f64 = 50.0;

pub const RAINFALL_WEIGHT: f64 = 0.6;
pub const AGE_WEIGHT: f64 = 0.4;

/// Lowest score classified as Moderate (inclusive).
pub const MODERATE_THRESHOLD: f64 = 0.5;
/// Lowest score classified as High (inclusive).
pub const HIGH_THRESHOLD: f64 = 0.8;

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Weighted risk score for one asset.
///
/// Negative ages are not rejected; they lower the score below that of a
/// brand-new asset.
pub fn risk_score(age_years: f64, rainfall_mm: f64) -> f64 {
    let age_factor = age_years / AGE_NORMALIZER_YEARS;
    let rainfall_factor = rainfall_mm / RAINFALL_NORMALIZER_MM;
    (RAINFALL_WEIGHT * rainfall_factor) + (AGE_WEIGHT * age_factor)
}

/// Maps a score onto a risk level. Lower bounds are closed.
pub fn classify(score: f64) -> RiskLevel {
    if score >= HIGH_THRESHOLD {
        RiskLevel::High
    } else if score >= MODERATE_THRESHOLD {
        RiskLevel::Moderate
    } else {
        RiskLevel::Low
    }
}

/// Assesses every record against a single rainfall value.
///
/// Returns one assessment per record, in input order. The input slice is
/// left untouched.
///
/// # Errors
/// `RiskError::InvalidRainfall` if `rainfall_mm` is negative, NaN, or infinite.
pub fn estimate(
    records: &[InfrastructureRecord],
    rainfall_mm: f64,
) -> Result<Vec<RiskAssessment>, RiskError> {
    if !rainfall_mm.is_finite() || rainfall_mm < 0.0 {
        return Err(RiskError::InvalidRainfall(rainfall_mm));
    }

    Ok(records
        .iter()
        .map(|record| assess(record, rainfall_mm))
        .collect())
}

fn assess(record: &InfrastructureRecord, rainfall_mm: f64) -> RiskAssessment {
    let score = risk_score(record.age, rainfall_mm);
    let level = classify(score);

    RiskAssessment {
        record: record.clone(),
        rainfall: rainfall_mm,
        risk_score: score,
        risk_level: level,
        recommendation: level.recommendation().to_string(),
    }
}

/// Counts assessments per risk level. Levels with no assessments are
/// present with a count of zero.
pub fn summarize(assessments: &[RiskAssessment]) -> BTreeMap<RiskLevel, usize> {
    let mut counts: BTreeMap<RiskLevel, usize> = [RiskLevel::Low, RiskLevel::Moderate, RiskLevel::High]
        .into_iter()
        .map(|level| (level, 0))
        .collect();

    for assessment in assessments {
        *counts.entry(assessment.risk_level).or_insert(0) += 1;
    }

    counts
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
