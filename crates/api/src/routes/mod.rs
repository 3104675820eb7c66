pub mod duplicates;
pub mod health;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /issues/duplicates/check                         duplicate check (POST)
/// /issues/duplicates/config                        detection config (GET)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/issues/duplicates", duplicates::router())
}
