//! Duplicate detection configuration.
//!
//! Every tunable of the detection engine lives in [`DetectionConfig`] so
//! callers (and tests) can inject boundary values directly.

use std::time::Duration;

use serde::Serialize;

use crate::category::DEFAULT_CATEGORY_BONUS;
use crate::error::CoreError;
use crate::threshold_validation::{validate_positive, validate_unit_range};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Domain terms that are strong duplicate signals in civic reports.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "broken",
    "damaged",
    "pothole",
    "streetlight",
    "leak",
    "leaking",
    "flooding",
    "flooded",
    "blocked",
    "overflowing",
    "hazard",
    "dangerous",
    "urgent",
    "safety",
    "graffiti",
    "vandalism",
    "garbage",
    "trash",
    "sewage",
    "crack",
    "fallen",
    "outage",
];

pub const DEFAULT_KEYWORD_WEIGHT: f64 = 2.0;

pub const DEFAULT_LOCATION_WEIGHT: f64 = 0.5;
pub const DEFAULT_TEXT_WEIGHT: f64 = 0.4;
pub const DEFAULT_CATEGORY_WEIGHT: f64 = 0.1;
/// Image similarity is disabled in the default weighting.
pub const DEFAULT_IMAGE_WEIGHT: f64 = 0.0;

/// Reports farther apart than this share no location similarity (50 m).
pub const DEFAULT_RADIUS_KM: f64 = 0.05;

/// Composite scores must be strictly greater than this to count as duplicates.
pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.7;

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_WINDOW_DAYS: i64 = 7;
pub const DEFAULT_CANDIDATE_LIMIT: i64 = 20;
pub const DEFAULT_MAX_RESULTS: usize = 2;

/// Slack allowed when checking that the signal weights sum to at most 1.
const WEIGHT_SUM_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Tunables for one duplicate detector.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionConfig {
    /// Lowercase keywords that carry `keyword_weight` in text similarity.
    pub keywords: Vec<String>,
    pub keyword_weight: f64,
    pub location_weight: f64,
    pub text_weight: f64,
    pub category_weight: f64,
    pub image_weight: f64,
    /// Raw category score when both categories match.
    pub category_bonus: f64,
    /// Location similarity falls linearly to zero at this distance.
    pub radius_km: f64,
    pub duplicate_threshold: f64,
    /// Deadline for the full fetch + score pipeline.
    pub timeout_ms: u64,
    /// Only issues created within this many days are candidates.
    pub window_days: i64,
    pub candidate_limit: i64,
    /// How many ranked duplicates the result keeps.
    pub max_results: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            keyword_weight: DEFAULT_KEYWORD_WEIGHT,
            location_weight: DEFAULT_LOCATION_WEIGHT,
            text_weight: DEFAULT_TEXT_WEIGHT,
            category_weight: DEFAULT_CATEGORY_WEIGHT,
            image_weight: DEFAULT_IMAGE_WEIGHT,
            category_bonus: DEFAULT_CATEGORY_BONUS,
            radius_km: DEFAULT_RADIUS_KM,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            window_days: DEFAULT_WINDOW_DAYS,
            candidate_limit: DEFAULT_CANDIDATE_LIMIT,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl DetectionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Length of the candidate look-back window.
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::days(self.window_days)
    }

    /// Whether image similarity contributes to the composite score.
    pub fn image_enabled(&self) -> bool {
        self.image_weight > 0.0
    }

    /// Check that every value is usable and that a composite score can
    /// never exceed 1.
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_unit_range(self.location_weight, "location_weight")?;
        validate_unit_range(self.text_weight, "text_weight")?;
        validate_unit_range(self.category_weight, "category_weight")?;
        validate_unit_range(self.image_weight, "image_weight")?;
        validate_unit_range(self.category_bonus, "category_bonus")?;
        validate_unit_range(self.duplicate_threshold, "duplicate_threshold")?;
        validate_positive(self.keyword_weight, "keyword_weight")?;
        validate_positive(self.radius_km, "radius_km")?;

        let weight_sum =
            self.location_weight + self.text_weight + self.category_weight + self.image_weight;
        if weight_sum > 1.0 + WEIGHT_SUM_EPSILON {
            return Err(CoreError::Validation(format!(
                "Signal weights must sum to at most 1.0, got {weight_sum}"
            )));
        }

        if self.timeout_ms == 0 {
            return Err(CoreError::Validation(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }
        if self.window_days <= 0 {
            return Err(CoreError::Validation(format!(
                "window_days must be greater than 0, got {}",
                self.window_days
            )));
        }
        if self.candidate_limit <= 0 {
            return Err(CoreError::Validation(format!(
                "candidate_limit must be greater than 0, got {}",
                self.candidate_limit
            )));
        }
        if self.max_results == 0 {
            return Err(CoreError::Validation(
                "max_results must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
