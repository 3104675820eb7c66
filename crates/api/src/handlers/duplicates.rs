//! Handlers for duplicate issue detection endpoints.
//!
//! The submission UI calls the check endpoint before filing a report and
//! decides whether to warn the user ("these look similar, proceed anyway?")
//! or submit straight away.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use civic_core::config::DetectionConfig;
use civic_core::error::CoreError;
use civic_core::geo::Coordinates;
use civic_core::scoring::DuplicateDetectionResult;
use civic_detection::{CheckStatus, DuplicateCheckRequest};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// Largest accepted image payload, in bytes of the encoded string.
pub const MAX_IMAGE_PAYLOAD_BYTES: usize = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Body of `POST /issues/duplicates/check`.
#[derive(Debug, Deserialize)]
pub struct CheckDuplicatesRequest {
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub coordinates: Option<Coordinates>,
    /// Encoded photo payload; passed through as opaque bytes.
    pub image: Option<String>,
    pub category: Option<String>,
}

impl CheckDuplicatesRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.description.trim().is_empty() {
            return Err(CoreError::Validation("Description must not be empty".to_string()).into());
        }
        if let Some(coords) = &self.coordinates {
            coords.validate()?;
        }
        if let Some(image) = &self.image {
            if image.len() > MAX_IMAGE_PAYLOAD_BYTES {
                return Err(AppError::BadRequest(format!(
                    "Image payload exceeds {MAX_IMAGE_PAYLOAD_BYTES} bytes"
                )));
            }
        }
        Ok(())
    }

    fn into_check_request(self) -> DuplicateCheckRequest {
        DuplicateCheckRequest {
            description: self.description,
            location: self.location,
            coordinates: self.coordinates,
            image: self.image.map(String::into_bytes),
            category: self.category.filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Verdict plus how the check ended, so the UI can show a
/// "duplicate check failed, proceeding" notice when it did not complete.
#[derive(Debug, Serialize)]
pub struct CheckDuplicatesResponse {
    #[serde(flatten)]
    pub result: DuplicateDetectionResult,
    pub check_status: CheckStatus,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/issues/duplicates/check
///
/// Compare a not-yet-submitted report against recent open issues. Detection
/// failures and timeouts still answer 200 with a "no duplicate" verdict.
pub async fn check_duplicates(
    State(state): State<AppState>,
    Json(body): Json<CheckDuplicatesRequest>,
) -> AppResult<impl IntoResponse> {
    body.validate()?;

    let outcome = state.detector.run_check(body.into_check_request()).await;
    Ok(Json(DataResponse {
        data: CheckDuplicatesResponse {
            result: outcome.result,
            check_status: outcome.status,
        },
    }))
}

/// GET /api/v1/issues/duplicates/config
///
/// Effective detection configuration (weights, thresholds, limits).
pub async fn get_config(State(state): State<AppState>) -> Json<DataResponse<DetectionConfig>> {
    Json(DataResponse {
        data: state.detector.config().clone(),
    })
}
