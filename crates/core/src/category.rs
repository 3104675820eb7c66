//! Category match bonus.

/// Bonus awarded when both reports carry the same category.
pub const DEFAULT_CATEGORY_BONUS: f64 = 0.3;

/// `bonus` if both categories are present and equal, otherwise `0.0`.
///
/// Comparison is exact; related-but-different categories earn nothing.
/// Empty or whitespace-only labels count as absent.
pub fn category_similarity(a: Option<&str>, b: Option<&str>, bonus: f64) -> f64 {
    match (present(a), present(b)) {
        (Some(a), Some(b)) if a == b => bonus,
        _ => 0.0,
    }
}

fn present(label: Option<&str>) -> Option<&str> {
    label.filter(|l| !l.trim().is_empty())
}
