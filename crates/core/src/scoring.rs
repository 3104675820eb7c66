//! Score combination: per-candidate composite scores, threshold and ranking.
//!
//! Pure CPU work over the bounded candidate list. Each candidate is scored
//! independently, so results do not depend on candidate order except for
//! tie-breaking (earlier, i.e. more recent, candidates win ties).

use std::collections::HashMap;

use serde::Serialize;

use crate::category::category_similarity;
use crate::config::DetectionConfig;
use crate::coordinates::extract_coordinates;
use crate::geo::{haversine_km, Coordinates};
use crate::issue::IssueSummary;
use crate::text_similarity::text_similarity;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// The signal that contributed most to a candidate's composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Location,
    Text,
    Category,
    Image,
}

impl MatchType {
    /// Pick the largest weighted contribution. Ties resolve in declaration order.
    pub fn dominant(location: f64, text: f64, category: f64, image: f64) -> Self {
        let mut best = (Self::Location, location);
        let rest = [
            (Self::Text, text),
            (Self::Category, category),
            (Self::Image, image),
        ];
        for (kind, value) in rest {
            if value > best.1 {
                best = (kind, value);
            }
        }
        best.0
    }
}

/// The new report's comparable signals.
#[derive(Debug, Clone, Copy)]
pub struct ReportSignals<'a> {
    pub description: &'a str,
    pub coordinates: Option<Coordinates>,
    pub category: Option<&'a str>,
}

/// One scored comparison against an existing issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateCandidate {
    pub issue_id: DbId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: Option<String>,
    pub status: String,
    pub created_at: Timestamp,
    /// Composite score in `[0, 1]`.
    pub similarity_score: f64,
    pub match_type: MatchType,
    pub location_similarity: f64,
    pub text_similarity: f64,
    pub category_similarity: f64,
    pub image_similarity: Option<f64>,
    /// Distance to the new report, when both sides have coordinates.
    pub distance_km: Option<f64>,
}

/// Outcome of a duplicate check.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DuplicateDetectionResult {
    pub is_duplicate: bool,
    /// Score of the top duplicate, or `0.0`.
    pub confidence: f64,
    /// Retained candidates, highest score first.
    pub duplicates: Vec<DuplicateCandidate>,
}

impl DuplicateDetectionResult {
    /// The fail-open verdict: no duplicates, zero confidence.
    pub fn no_duplicate() -> Self {
        Self::default()
    }

    fn from_ranked(duplicates: Vec<DuplicateCandidate>) -> Self {
        let confidence = duplicates.first().map_or(0.0, |d| d.similarity_score);
        Self {
            is_duplicate: !duplicates.is_empty(),
            confidence,
            duplicates,
        }
    }
}

// ---------------------------------------------------------------------------
// Signals
// ---------------------------------------------------------------------------

/// Linear falloff from `1.0` at zero distance to `0.0` at `radius_km` and beyond.
pub fn location_similarity(distance_km: f64, radius_km: f64) -> f64 {
    if distance_km <= radius_km {
        (1.0 - distance_km / radius_km).max(0.0)
    } else {
        0.0
    }
}

/// Strict comparison: a score equal to the threshold is not a duplicate.
pub fn is_above_threshold(score: f64, threshold: f64) -> bool {
    score > threshold
}

// ---------------------------------------------------------------------------
// Combiner
// ---------------------------------------------------------------------------

/// Score one candidate against the new report.
///
/// `image_similarity` is only consulted when the image signal is enabled.
pub fn score_candidate(
    report: &ReportSignals<'_>,
    candidate: &IssueSummary,
    image_similarity: Option<f64>,
    config: &DetectionConfig,
) -> DuplicateCandidate {
    let distance_km = report
        .coordinates
        .zip(extract_coordinates(&candidate.location))
        .map(|(new, existing)| haversine_km(new, existing));
    let location = distance_km.map_or(0.0, |d| location_similarity(d, config.radius_km));

    let text = text_similarity(
        report.description,
        &candidate.description,
        &config.keywords,
        config.keyword_weight,
    );

    let category = category_similarity(
        report.category,
        candidate.category.as_deref(),
        config.category_bonus,
    );

    let image = if config.image_enabled() {
        image_similarity.map(|s| s.clamp(0.0, 1.0))
    } else {
        None
    };

    let location_part = config.location_weight * location;
    let text_part = config.text_weight * text;
    let category_part = config.category_weight * category;
    let image_part = config.image_weight * image.unwrap_or(0.0);

    let composite = (location_part + text_part + category_part + image_part).clamp(0.0, 1.0);

    DuplicateCandidate {
        issue_id: candidate.id,
        title: candidate.title.clone(),
        description: candidate.description.clone(),
        location: candidate.location.clone(),
        category: candidate.category.clone(),
        status: candidate.status.clone(),
        created_at: candidate.created_at,
        similarity_score: composite,
        match_type: MatchType::dominant(location_part, text_part, category_part, image_part),
        location_similarity: location,
        text_similarity: text,
        category_similarity: category,
        image_similarity: image,
        distance_km,
    }
}

/// Score every candidate, keep those above the threshold and rank them.
///
/// `image_scores` maps candidate ids to precomputed image similarities; it is
/// empty when the image signal is disabled.
pub fn combine_scores(
    report: &ReportSignals<'_>,
    candidates: &[IssueSummary],
    image_scores: &HashMap<DbId, f64>,
    config: &DetectionConfig,
) -> DuplicateDetectionResult {
    let mut retained: Vec<DuplicateCandidate> = candidates
        .iter()
        .map(|c| score_candidate(report, c, image_scores.get(&c.id).copied(), config))
        .filter(|d| is_above_threshold(d.similarity_score, config.duplicate_threshold))
        .collect();

    // Stable sort keeps input (recency) order among equal scores.
    retained.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
    retained.truncate(config.max_results);

    DuplicateDetectionResult::from_ranked(retained)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
