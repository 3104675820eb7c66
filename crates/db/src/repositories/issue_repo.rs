//! Repository for the `issues` table (duplicate candidate reads only).

use civic_core::types::Timestamp;
use sqlx::PgPool;

use crate::models::issue::IssueCandidateRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "\
    id, title, description, location, image_url, category, \
    status, created_by, created_at";

/// Read access to issues for duplicate detection.
pub struct IssueRepo;

impl IssueRepo {
    /// List issues created at or after `since` whose status is not
    /// `exclude_status`, newest first, capped at `limit`.
    pub async fn list_recent_excluding_status(
        pool: &PgPool,
        since: Timestamp,
        exclude_status: &str,
        limit: i64,
    ) -> Result<Vec<IssueCandidateRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM issues \
             WHERE created_at >= $1 AND status <> $2 \
             ORDER BY created_at DESC, id DESC \
             LIMIT $3"
        );
        sqlx::query_as::<_, IssueCandidateRow>(&query)
            .bind(since)
            .bind(exclude_status)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
