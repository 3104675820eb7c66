//! Duplicate issue detection pipeline.
//!
//! [`DuplicateDetector`] fetches recent open issues from an
//! [`IssueStore`](civic_core::issue::IssueStore), scores them against a new
//! report and races the whole pipeline against a deadline. Every failure mode
//! degrades to "no duplicate" so submission is never blocked.

pub mod detector;
pub mod memory_store;

pub use detector::{CheckOutcome, CheckStatus, DuplicateCheckRequest, DuplicateDetector};
pub use memory_store::InMemoryIssueStore;
