//! Optional image-similarity signal.
//!
//! Comparing photos goes through an external service (for example, captioning
//! both images and comparing the captions), which is too slow for the default
//! submission path. The signal is therefore off unless a comparer is installed
//! and `DetectionConfig::image_weight` is positive.

use async_trait::async_trait;

use crate::error::DetectionError;

/// Scores how alike a submitted photo is to a stored one.
#[async_trait]
pub trait ImageComparer: Send + Sync {
    /// Similarity in `[0, 1]` between the new image bytes and the image stored
    /// under `candidate_image`.
    async fn compare(
        &self,
        new_image: &[u8],
        candidate_image: &str,
    ) -> Result<f64, DetectionError>;
}
