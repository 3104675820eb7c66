//! The duplicate detector and its timeout guard.
//!
//! Each check runs the fetch + score pipeline in its own Tokio task and races
//! it against a deadline. Whichever finishes first decides the outcome; the
//! losing task is aborted, and since its result can only be observed through
//! the join handle, a late result is simply dropped. The handle aborts the
//! task on drop, so a caller that stops waiting cancels the pipeline too.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::time::Instant;
use tokio_util::task::AbortOnDropHandle;

use civic_core::config::DetectionConfig;
use civic_core::error::DetectionError;
use civic_core::geo::Coordinates;
use civic_core::image_similarity::ImageComparer;
use civic_core::issue::{CandidateQuery, IssueStore, IssueSummary};
use civic_core::scoring::{combine_scores, DuplicateDetectionResult, ReportSignals};
use civic_core::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Request / outcome
// ---------------------------------------------------------------------------

/// A new report about to be submitted.
#[derive(Debug, Clone, Default)]
pub struct DuplicateCheckRequest {
    pub description: String,
    pub location: String,
    /// Explicit coordinates; when absent, `location` is parsed instead.
    pub coordinates: Option<Coordinates>,
    /// Raw photo bytes. Only used when image similarity is enabled.
    pub image: Option<Vec<u8>>,
    pub category: Option<String>,
}

/// How a check ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Completed,
    TimedOut,
    Failed,
}

/// The result of a check together with how it was reached.
///
/// For [`CheckStatus::TimedOut`] and [`CheckStatus::Failed`] the result is
/// always [`DuplicateDetectionResult::no_duplicate`].
#[derive(Debug, Clone)]
pub struct CheckOutcome {
    pub status: CheckStatus,
    pub result: DuplicateDetectionResult,
    pub elapsed_ms: u64,
}

impl CheckOutcome {
    fn completed(result: DuplicateDetectionResult, elapsed_ms: u64) -> Self {
        Self {
            status: CheckStatus::Completed,
            result,
            elapsed_ms,
        }
    }

    fn fallback(status: CheckStatus, elapsed_ms: u64) -> Self {
        Self {
            status,
            result: DuplicateDetectionResult::no_duplicate(),
            elapsed_ms,
        }
    }
}

// ---------------------------------------------------------------------------
// Detector
// ---------------------------------------------------------------------------

/// Checks new reports against recent open issues.
///
/// Cheap to clone; holds no per-call state.
#[derive(Clone)]
pub struct DuplicateDetector {
    store: Arc<dyn IssueStore>,
    image_comparer: Option<Arc<dyn ImageComparer>>,
    config: Arc<DetectionConfig>,
}

impl DuplicateDetector {
    pub fn new(store: Arc<dyn IssueStore>, config: DetectionConfig) -> Self {
        Self {
            store,
            image_comparer: None,
            config: Arc::new(config),
        }
    }

    /// Install an image comparer. It is only consulted when
    /// `config.image_weight` is positive.
    pub fn with_image_comparer(mut self, comparer: Arc<dyn ImageComparer>) -> Self {
        self.image_comparer = Some(comparer);
        self
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Run a duplicate check and return only the verdict.
    pub async fn check_for_duplicates(
        &self,
        request: DuplicateCheckRequest,
    ) -> DuplicateDetectionResult {
        self.run_check(request).await.result
    }

    /// Run a duplicate check, reporting whether it completed, timed out or failed.
    pub async fn run_check(&self, request: DuplicateCheckRequest) -> CheckOutcome {
        let start = Instant::now();
        let timeout = self.config.timeout();

        let pipeline = Pipeline {
            store: Arc::clone(&self.store),
            image_comparer: self.image_comparer.clone(),
            config: Arc::clone(&self.config),
        };
        let handle = tokio::spawn(async move { pipeline.run(request, Utc::now()).await });
        let mut task = AbortOnDropHandle::new(handle);

        let outcome = tokio::select! {
            biased;
            joined = &mut task => {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                match joined {
                    Ok(Ok(result)) => CheckOutcome::completed(result, elapsed_ms),
                    Ok(Err(e)) => {
                        tracing::warn!(
                            error = %e,
                            elapsed_ms,
                            "Duplicate check failed, proceeding without it",
                        );
                        CheckOutcome::fallback(CheckStatus::Failed, elapsed_ms)
                    }
                    Err(join_err) => {
                        let e = DetectionError::Task(join_err.to_string());
                        tracing::error!(error = %e, elapsed_ms, "Duplicate check task aborted");
                        CheckOutcome::fallback(CheckStatus::Failed, elapsed_ms)
                    }
                }
            }
            () = tokio::time::sleep(timeout) => {
                task.abort();
                let elapsed_ms = start.elapsed().as_millis() as u64;
                let e = DetectionError::Timeout { elapsed_ms };
                tracing::warn!(
                    error = %e,
                    timeout_ms = self.config.timeout_ms,
                    "Duplicate check timed out, proceeding without it",
                );
                CheckOutcome::fallback(CheckStatus::TimedOut, elapsed_ms)
            }
        };

        if outcome.status == CheckStatus::Completed {
            tracing::info!(
                is_duplicate = outcome.result.is_duplicate,
                confidence = outcome.result.confidence,
                matches = outcome.result.duplicates.len(),
                elapsed_ms = outcome.elapsed_ms,
                "Duplicate check completed",
            );
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Owned copy of everything one check needs, moved into the spawned task.
struct Pipeline {
    store: Arc<dyn IssueStore>,
    image_comparer: Option<Arc<dyn ImageComparer>>,
    config: Arc<DetectionConfig>,
}

impl Pipeline {
    async fn run(
        self,
        request: DuplicateCheckRequest,
        now: Timestamp,
    ) -> Result<DuplicateDetectionResult, DetectionError> {
        let query =
            CandidateQuery::recent_open(now, self.config.window(), self.config.candidate_limit);
        let candidates = self.fetch_candidates(&query).await?;

        let image_scores = self.image_scores(&request, &candidates).await;

        let report = ReportSignals {
            description: &request.description,
            coordinates: request
                .coordinates
                .or_else(|| civic_core::coordinates::extract_coordinates(&request.location)),
            category: request.category.as_deref(),
        };

        Ok(combine_scores(&report, &candidates, &image_scores, &self.config))
    }

    /// Fetch candidates and re-apply the query bounds, so a misbehaving store
    /// cannot widen the comparison set.
    async fn fetch_candidates(
        &self,
        query: &CandidateQuery,
    ) -> Result<Vec<IssueSummary>, DetectionError> {
        let mut candidates = self.store.fetch_recent_open_issues(query).await?;
        candidates.retain(|c| c.created_at >= query.since && c.status != query.exclude_status);
        candidates.truncate(usize::try_from(query.limit).unwrap_or(0));
        tracing::debug!(count = candidates.len(), "Scoring duplicate candidates");
        Ok(candidates)
    }

    /// Image similarity per candidate id. Empty unless the signal is enabled,
    /// a comparer is installed and the new report has a photo.
    async fn image_scores(
        &self,
        request: &DuplicateCheckRequest,
        candidates: &[IssueSummary],
    ) -> HashMap<DbId, f64> {
        let mut scores = HashMap::new();
        if !self.config.image_enabled() {
            return scores;
        }
        let (Some(comparer), Some(image)) = (&self.image_comparer, &request.image) else {
            return scores;
        };

        for candidate in candidates {
            let Some(candidate_image) = candidate.image.as_deref() else {
                continue;
            };
            match comparer.compare(image, candidate_image).await {
                Ok(score) => {
                    scores.insert(candidate.id, score);
                }
                Err(e) => {
                    tracing::debug!(
                        issue_id = candidate.id,
                        error = %e,
                        "Image comparison skipped",
                    );
                }
            }
        }
        scores
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use civic_core::scoring::MatchType;

    use crate::memory_store::InMemoryIssueStore;

    const MAIN_ST: &str = "Broken streetlight on Main Street";

    fn issue(id: DbId, description: &str, location: &str) -> IssueSummary {
        IssueSummary {
            id,
            title: format!("Issue {id}"),
            description: description.to_string(),
            location: location.to_string(),
            image: Some(format!("uploads/{id}.jpg")),
            category: Some("lighting".to_string()),
            created_at: Utc::now() - ChronoDuration::hours(id),
            created_by: 1,
            status: "open".to_string(),
        }
    }

    fn request(description: &str, lat: f64, lng: f64) -> DuplicateCheckRequest {
        DuplicateCheckRequest {
            description: description.to_string(),
            location: "Main Street".to_string(),
            coordinates: Coordinates::new(lat, lng),
            image: None,
            category: None,
        }
    }

    fn detector_with(issues: Vec<IssueSummary>, config: DetectionConfig) -> DuplicateDetector {
        DuplicateDetector::new(Arc::new(InMemoryIssueStore::new(issues)), config)
    }

    // -- Test doubles --------------------------------------------------------

    struct FailingStore;

    #[async_trait]
    impl IssueStore for FailingStore {
        async fn fetch_recent_open_issues(
            &self,
            _query: &CandidateQuery,
        ) -> Result<Vec<IssueSummary>, DetectionError> {
            Err(DetectionError::Fetch("connection refused".to_string()))
        }
    }

    struct PanickingStore;

    #[async_trait]
    impl IssueStore for PanickingStore {
        async fn fetch_recent_open_issues(
            &self,
            _query: &CandidateQuery,
        ) -> Result<Vec<IssueSummary>, DetectionError> {
            panic!("malformed row");
        }
    }

    /// Sleeps before answering and records whether it ever finished.
    struct SlowStore {
        delay: Duration,
        issues: Vec<IssueSummary>,
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl IssueStore for SlowStore {
        async fn fetch_recent_open_issues(
            &self,
            _query: &CandidateQuery,
        ) -> Result<Vec<IssueSummary>, DetectionError> {
            tokio::time::sleep(self.delay).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(self.issues.clone())
        }
    }

    /// Records the query it receives and returns a canned list.
    struct RecordingStore {
        seen: Mutex<Option<CandidateQuery>>,
        issues: Vec<IssueSummary>,
    }

    #[async_trait]
    impl IssueStore for RecordingStore {
        async fn fetch_recent_open_issues(
            &self,
            query: &CandidateQuery,
        ) -> Result<Vec<IssueSummary>, DetectionError> {
            *self.seen.lock().unwrap() = Some(query.clone());
            Ok(self.issues.clone())
        }
    }

    struct FixedImageComparer {
        score: f64,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ImageComparer for FixedImageComparer {
        async fn compare(&self, _new: &[u8], _candidate: &str) -> Result<f64, DetectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.score)
        }
    }

    // -- Completed checks ----------------------------------------------------

    #[tokio::test]
    async fn flags_nearby_identical_report() {
        let detector = detector_with(
            vec![issue(1, MAIN_ST, "40.7129,-74.0061")],
            DetectionConfig::default(),
        );
        let outcome = detector.run_check(request(MAIN_ST, 40.7128, -74.0060)).await;

        assert_eq!(outcome.status, CheckStatus::Completed);
        assert!(outcome.result.is_duplicate);
        assert_eq!(outcome.result.duplicates[0].issue_id, 1);
        assert!((outcome.result.confidence - 0.76).abs() < 0.01);
    }

    #[tokio::test]
    async fn unrelated_report_is_not_flagged() {
        let detector = detector_with(
            vec![issue(1, "Pothole needs repair urgently", "40.7128,-74.0060")],
            DetectionConfig::default(),
        );
        let outcome = detector
            .run_check(request("New park bench installation needed", 40.7128, -74.0060))
            .await;

        assert_eq!(outcome.status, CheckStatus::Completed);
        assert_eq!(outcome.result, DuplicateDetectionResult::no_duplicate());
    }

    #[tokio::test]
    async fn coordinates_fall_back_to_location_text() {
        let detector = detector_with(
            vec![issue(1, MAIN_ST, "40.7129,-74.0061")],
            DetectionConfig::default(),
        );
        let req = DuplicateCheckRequest {
            description: MAIN_ST.to_string(),
            location: "Main St (40.7128, -74.0060)".to_string(),
            ..DuplicateCheckRequest::default()
        };
        let result = detector.check_for_duplicates(req).await;
        assert!(result.is_duplicate);
        assert!(result.duplicates[0].location_similarity > 0.7);
    }

    #[tokio::test]
    async fn returns_at_most_two_sorted_duplicates() {
        let issues = (1..=5)
            .map(|i| issue(i, MAIN_ST, &format!("{},-74.0", 40.0 + i as f64 * 0.00002)))
            .collect();
        let detector = detector_with(issues, DetectionConfig::default());

        let result = detector.check_for_duplicates(request(MAIN_ST, 40.0, -74.0)).await;
        let ids: Vec<DbId> = result.duplicates.iter().map(|d| d.issue_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!(result.duplicates[0].similarity_score > result.duplicates[1].similarity_score);
    }

    #[tokio::test]
    async fn repeated_checks_are_identical() {
        let detector = detector_with(
            vec![
                issue(1, MAIN_ST, "40.7129,-74.0061"),
                issue(2, "Streetlight broken near Main Street corner", "40.71285,-74.00605"),
            ],
            DetectionConfig::default(),
        );
        let first = detector.check_for_duplicates(request(MAIN_ST, 40.7128, -74.0060)).await;
        for _ in 0..5 {
            let again = detector.check_for_duplicates(request(MAIN_ST, 40.7128, -74.0060)).await;
            assert_eq!(again, first);
        }
    }

    #[tokio::test]
    async fn queries_store_with_configured_window_and_limit() {
        let store = Arc::new(RecordingStore {
            seen: Mutex::new(None),
            issues: Vec::new(),
        });
        let detector = DuplicateDetector::new(store.clone(), DetectionConfig::default());

        let before = Utc::now();
        detector.check_for_duplicates(request(MAIN_ST, 40.0, -74.0)).await;
        let after = Utc::now();

        let query = store.seen.lock().unwrap().clone().expect("store was queried");
        assert_eq!(query.limit, 20);
        assert_eq!(query.exclude_status, "resolved");
        assert!(query.since >= before - ChronoDuration::days(7));
        assert!(query.since <= after - ChronoDuration::days(7));
    }

    #[tokio::test]
    async fn candidates_outside_bounds_are_ignored() {
        let mut resolved = issue(1, MAIN_ST, "40.0,-74.0");
        resolved.status = "resolved".to_string();
        let mut stale = issue(2, MAIN_ST, "40.0,-74.0");
        stale.created_at = Utc::now() - ChronoDuration::days(30);

        let store = Arc::new(RecordingStore {
            seen: Mutex::new(None),
            issues: vec![resolved, stale],
        });
        let detector = DuplicateDetector::new(store, DetectionConfig::default());

        let outcome = detector.run_check(request(MAIN_ST, 40.0, -74.0)).await;
        assert_eq!(outcome.status, CheckStatus::Completed);
        assert!(!outcome.result.is_duplicate);
    }

    // -- Fail-open -----------------------------------------------------------

    #[tokio::test]
    async fn fetch_error_fails_open() {
        let detector = DuplicateDetector::new(Arc::new(FailingStore), DetectionConfig::default());
        let outcome = detector.run_check(request(MAIN_ST, 40.0, -74.0)).await;

        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(outcome.result, DuplicateDetectionResult::no_duplicate());
    }

    #[tokio::test]
    async fn panicking_store_fails_open() {
        let detector = DuplicateDetector::new(Arc::new(PanickingStore), DetectionConfig::default());
        let outcome = detector.run_check(request(MAIN_ST, 40.0, -74.0)).await;

        assert_eq!(outcome.status, CheckStatus::Failed);
        assert_eq!(outcome.result, DuplicateDetectionResult::no_duplicate());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_times_out_after_five_seconds() {
        let finished = Arc::new(AtomicBool::new(false));
        let store = Arc::new(SlowStore {
            delay: Duration::from_secs(10),
            issues: vec![issue(1, MAIN_ST, "40.0,-74.0")],
            finished: Arc::clone(&finished),
        });
        let detector = DuplicateDetector::new(store, DetectionConfig::default());

        let outcome = detector.run_check(request(MAIN_ST, 40.0, -74.0)).await;
        assert_eq!(outcome.status, CheckStatus::TimedOut);
        assert_eq!(outcome.result, DuplicateDetectionResult::no_duplicate());
        assert!(outcome.elapsed_ms >= 5_000);
        assert!(outcome.elapsed_ms < 10_000);

        // The abandoned fetch never resumes.
        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_check_cancels_the_pipeline() {
        let finished = Arc::new(AtomicBool::new(false));
        let store = Arc::new(SlowStore {
            delay: Duration::from_secs(3),
            issues: vec![issue(1, MAIN_ST, "40.0,-74.0")],
            finished: Arc::clone(&finished),
        });
        let detector = DuplicateDetector::new(store, DetectionConfig::default());

        // The caller gives up after 1 s, well before the 5 s deadline.
        let gave_up = tokio::time::timeout(
            Duration::from_secs(1),
            detector.run_check(request(MAIN_ST, 40.0, -74.0)),
        )
        .await;
        assert!(gave_up.is_err());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn store_finishing_inside_deadline_completes() {
        let finished = Arc::new(AtomicBool::new(false));
        let store = Arc::new(SlowStore {
            delay: Duration::from_secs(4),
            issues: vec![issue(1, MAIN_ST, "40.0,-74.0")],
            finished: Arc::clone(&finished),
        });
        let detector = DuplicateDetector::new(store, DetectionConfig::default());

        let outcome = detector.run_check(request(MAIN_ST, 40.0, -74.0)).await;
        assert_eq!(outcome.status, CheckStatus::Completed);
        assert!(outcome.result.is_duplicate);
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn configured_timeout_is_honoured() {
        let store = Arc::new(SlowStore {
            delay: Duration::from_millis(200),
            issues: Vec::new(),
            finished: Arc::new(AtomicBool::new(false)),
        });
        let config = DetectionConfig {
            timeout_ms: 100,
            ..DetectionConfig::default()
        };
        let detector = DuplicateDetector::new(store, config);

        let outcome = detector.run_check(request(MAIN_ST, 40.0, -74.0)).await;
        assert_matches!(outcome.status, CheckStatus::TimedOut);
    }

    // -- Image extension -----------------------------------------------------

    #[tokio::test]
    async fn image_comparer_unused_by_default() {
        let comparer = Arc::new(FixedImageComparer {
            score: 1.0,
            calls: AtomicUsize::new(0),
        });
        let detector = detector_with(vec![issue(1, MAIN_ST, "")], DetectionConfig::default())
            .with_image_comparer(comparer.clone());

        let mut req = request(MAIN_ST, 40.0, -74.0);
        req.image = Some(vec![0xFF, 0xD8]);
        let result = detector.check_for_duplicates(req).await;

        assert_eq!(comparer.calls.load(Ordering::SeqCst), 0);
        assert!(!result.is_duplicate);
    }

    #[tokio::test]
    async fn image_comparer_contributes_when_enabled() {
        let comparer = Arc::new(FixedImageComparer {
            score: 0.9,
            calls: AtomicUsize::new(0),
        });
        let config = DetectionConfig {
            location_weight: 0.3,
            text_weight: 0.3,
            category_weight: 0.0,
            image_weight: 0.4,
            ..DetectionConfig::default()
        };
        let mut without_image = issue(2, MAIN_ST, "");
        without_image.image = None;
        let detector = detector_with(vec![issue(1, MAIN_ST, ""), without_image], config)
            .with_image_comparer(comparer.clone());

        let mut req = request(MAIN_ST, 40.0, -74.0);
        req.image = Some(vec![0xFF, 0xD8]);
        let result = detector.check_for_duplicates(req).await;

        // Only the candidate with a stored photo is compared: 0.3 * 1.0 + 0.4 * 0.9 = 0.66.
        assert_eq!(comparer.calls.load(Ordering::SeqCst), 1);
        assert!(!result.is_duplicate);

        let report = ReportSignals {
            description: MAIN_ST,
            coordinates: None,
            category: None,
        };
        let scored = civic_core::scoring::score_candidate(
            &report,
            &issue(1, MAIN_ST, ""),
            Some(0.9),
            detector.config(),
        );
        assert_eq!(scored.match_type, MatchType::Image);
        assert!((scored.similarity_score - 0.66).abs() < 1e-9);
    }
}
