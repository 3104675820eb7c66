//! Route definitions for duplicate issue detection.
//!
//! ```text
//! /issues/duplicates/check     check a new report (POST)
//! /issues/duplicates/config    effective detection config (GET)
//! ```

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::duplicates;
use crate::state::AppState;

/// Duplicate detection routes, nested at `/issues/duplicates`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check", post(duplicates::check_duplicates))
        .route("/config", get(duplicates::get_config))
}
