use std::sync::Arc;

use civic_detection::DuplicateDetector;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: civic_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Duplicate detector used by the submission flow.
    pub detector: DuplicateDetector,
}
