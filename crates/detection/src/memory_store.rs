//! In-memory [`IssueStore`] for tests and local development.

use async_trait::async_trait;
use civic_core::error::DetectionError;
use civic_core::issue::{CandidateQuery, IssueStore, IssueSummary};

/// Holds a fixed list of issues and answers candidate queries against it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIssueStore {
    issues: Vec<IssueSummary>,
}

impl InMemoryIssueStore {
    pub fn new(issues: Vec<IssueSummary>) -> Self {
        Self { issues }
    }
}

#[async_trait]
impl IssueStore for InMemoryIssueStore {
    async fn fetch_recent_open_issues(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<IssueSummary>, DetectionError> {
        let mut matching: Vec<IssueSummary> = self
            .issues
            .iter()
            .filter(|i| i.created_at >= query.since && i.status != query.exclude_status)
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching.truncate(usize::try_from(query.limit).unwrap_or(0));
        Ok(matching)
    }
}
