//! Issue read model and the issue-store boundary used for candidate retrieval.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DetectionError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Status constants
// ---------------------------------------------------------------------------

pub const STATUS_OPEN: &str = "open";
pub const STATUS_ACKNOWLEDGED: &str = "acknowledged";
pub const STATUS_IN_PROGRESS: &str = "in_progress";
pub const STATUS_RESOLVED: &str = "resolved";
pub const VALID_STATUSES: &[&str] = &[
    STATUS_OPEN,
    STATUS_ACKNOWLEDGED,
    STATUS_IN_PROGRESS,
    STATUS_RESOLVED,
];

pub fn is_valid_status(status: &str) -> bool {
    VALID_STATUSES.contains(&status)
}

// ---------------------------------------------------------------------------
// Read model
// ---------------------------------------------------------------------------

/// Projection of a stored report with only the fields needed for comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueSummary {
    pub id: DbId,
    pub title: String,
    pub description: String,
    /// Free-form location text; may or may not contain coordinates.
    pub location: String,
    /// Reference (URL or storage key) to the report's photo, if any.
    pub image: Option<String>,
    pub category: Option<String>,
    pub created_at: Timestamp,
    pub created_by: DbId,
    pub status: String,
}

// ---------------------------------------------------------------------------
// Store boundary
// ---------------------------------------------------------------------------

/// Parameters for a candidate fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateQuery {
    /// Only issues created at or after this instant.
    pub since: Timestamp,
    /// Issues in this status are never candidates.
    pub exclude_status: String,
    pub limit: i64,
}

impl CandidateQuery {
    /// Candidates created within `window` before `now`, excluding resolved issues.
    pub fn recent_open(now: Timestamp, window: chrono::Duration, limit: i64) -> Self {
        Self {
            since: now - window,
            exclude_status: STATUS_RESOLVED.to_string(),
            limit,
        }
    }
}

/// Source of recent, still-open issues.
///
/// Implementations return at most `query.limit` issues, newest first.
#[async_trait]
pub trait IssueStore: Send + Sync {
    async fn fetch_recent_open_issues(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<IssueSummary>, DetectionError>;
}
