//! PostgreSQL-backed [`IssueStore`].

use async_trait::async_trait;
use civic_core::error::DetectionError;
use civic_core::issue::{CandidateQuery, IssueStore, IssueSummary};

use crate::repositories::IssueRepo;
use crate::DbPool;

/// Serves duplicate candidates from the `issues` table.
#[derive(Clone)]
pub struct PgIssueStore {
    pool: DbPool,
}

impl PgIssueStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IssueStore for PgIssueStore {
    async fn fetch_recent_open_issues(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<IssueSummary>, DetectionError> {
        let rows = IssueRepo::list_recent_excluding_status(
            &self.pool,
            query.since,
            &query.exclude_status,
            query.limit,
        )
        .await
        .map_err(|e| DetectionError::Fetch(e.to_string()))?;

        tracing::debug!(count = rows.len(), since = %query.since, "Fetched duplicate candidates");
        Ok(rows.into_iter().map(IssueSummary::from).collect())
    }
}
