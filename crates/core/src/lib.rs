//! Domain logic for duplicate issue detection.
//!
//! Pure functions and types only; database access lives in `civic-db` and the
//! async pipeline in `civic-detection`.

pub mod category;
pub mod config;
pub mod coordinates;
pub mod error;
pub mod geo;
pub mod image_similarity;
pub mod issue;
pub mod scoring;
pub mod text_similarity;
pub mod threshold_validation;
pub mod types;
