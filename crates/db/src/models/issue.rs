//! Issue row model for duplicate candidate retrieval.
//!
//! Maps the scoring columns of the `issues` table.

use civic_core::issue::IssueSummary;
use civic_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// The subset of an `issues` row read when looking for duplicates.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct IssueCandidateRow {
    pub id: DbId,
    pub title: String,
    pub description: String,
    pub location: String,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub status: String,
    pub created_by: DbId,
    pub created_at: Timestamp,
}

impl From<IssueCandidateRow> for IssueSummary {
    fn from(row: IssueCandidateRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            location: row.location,
            image: row.image_url,
            category: row.category,
            created_at: row.created_at,
            created_by: row.created_by,
            status: row.status,
        }
    }
}
