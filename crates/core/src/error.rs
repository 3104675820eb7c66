#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),
}

/// Failures inside the duplicate-detection pipeline.
///
/// None of these reach the submission flow as a hard failure: the timeout
/// guard converts every variant into the "no duplicate" fallback.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    /// The issue store was unreachable or returned malformed data.
    #[error("Candidate fetch failed: {0}")]
    Fetch(String),

    /// The pipeline did not finish inside the configured deadline.
    #[error("Duplicate check timed out after {elapsed_ms}ms")]
    Timeout { elapsed_ms: u64 },

    /// The pipeline task panicked or was cancelled.
    #[error("Duplicate check task failed: {0}")]
    Task(String),
}
