//! Description similarity: token-set Jaccard with domain keyword weighting.

use std::collections::HashSet;

/// Tokens of this many characters or fewer are ignored.
pub const MAX_IGNORED_TOKEN_LEN: usize = 2;

/// Split on whitespace, lowercase, and drop short tokens.
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(str::to_lowercase)
        .filter(|t| t.chars().count() > MAX_IGNORED_TOKEN_LEN)
        .collect()
}

/// Plain Jaccard index over two token sets. Empty input scores `0.0`.
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    intersection as f64 / union as f64
}

/// Jaccard index where keyword tokens count `keyword_weight` times.
pub fn weighted_jaccard(
    a: &HashSet<String>,
    b: &HashSet<String>,
    keywords: &[String],
    keyword_weight: f64,
) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let weight = |token: &String| {
        if keywords.iter().any(|k| k.eq_ignore_ascii_case(token)) {
            keyword_weight
        } else {
            1.0
        }
    };

    let mut union_weight = 0.0;
    let mut intersection_weight = 0.0;
    for token in a.union(b) {
        let w = weight(token);
        union_weight += w;
        if a.contains(token) && b.contains(token) {
            intersection_weight += w;
        }
    }

    if union_weight <= 0.0 {
        return 0.0;
    }
    intersection_weight / union_weight
}

/// Similarity of two free-text descriptions in `[0, 1]`.
///
/// The larger of the plain and keyword-weighted Jaccard indices, so reports
/// sharing only a few strong domain terms are not penalised.
pub fn text_similarity(a: &str, b: &str, keywords: &[String], keyword_weight: f64) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let basic = jaccard(&tokens_a, &tokens_b);
    let weighted = weighted_jaccard(&tokens_a, &tokens_b, keywords, keyword_weight);
    basic.max(weighted).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_KEYWORDS;

    fn keywords() -> Vec<String> {
        DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
    }

    fn sim(a: &str, b: &str) -> f64 {
        text_similarity(a, b, &keywords(), 2.0)
    }

    #[test]
    fn tokenize_lowercases_and_drops_short_tokens() {
        let tokens = tokenize("Broken streetlight ON Main St");
        assert!(tokens.contains("broken"));
        assert!(tokens.contains("streetlight"));
        assert!(tokens.contains("main"));
        assert!(!tokens.contains("on"));
        assert!(!tokens.contains("st"));
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn two_char_tokens_are_excluded_three_char_included() {
        assert_eq!(sim("ab", "ab"), 0.0);
        assert_eq!(sim("abc", "abc"), 1.0);
        assert_eq!(sim("xy abc", "zz abc"), 1.0);
    }

    #[test]
    fn identical_descriptions_score_one() {
        let d = "Broken streetlight on Main Street";
        assert_eq!(sim(d, d), 1.0);
    }

    #[test]
    fn case_is_ignored() {
        assert_eq!(sim("POTHOLE near school", "pothole NEAR School"), 1.0);
    }

    #[test]
    fn empty_or_all_short_input_scores_zero() {
        assert_eq!(sim("", "Broken streetlight"), 0.0);
        assert_eq!(sim("Broken streetlight", "   "), 0.0);
        assert_eq!(sim("a b c", "Broken streetlight"), 0.0);
    }

    #[test]
    fn disjoint_descriptions_score_zero() {
        assert_eq!(
            sim("New park bench installation needed", "Pothole needs repair urgently"),
            0.0
        );
    }

    #[test]
    fn keyword_overlap_boosts_score_above_plain_jaccard() {
        let a = tokenize("broken light pole");
        let b = tokenize("broken sign here");
        let basic = jaccard(&a, &b);
        let weighted = weighted_jaccard(&a, &b, &keywords(), 2.0);
        assert!((basic - 0.2).abs() < 1e-9);
        assert!((weighted - 2.0 / 6.0).abs() < 1e-9);
        assert!((sim("broken light pole", "broken sign here") - 2.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn non_keyword_overlap_keeps_plain_jaccard() {
        // Shared token is plain, the unshared ones are keywords: weighting lowers the score.
        let a = tokenize("pothole bench");
        let b = tokenize("flooding bench");
        let basic = jaccard(&a, &b);
        let weighted = weighted_jaccard(&a, &b, &keywords(), 2.0);
        assert!(weighted < basic);
        assert!((sim("pothole bench", "flooding bench") - basic).abs() < 1e-9);
    }

    #[test]
    fn score_stays_in_unit_range() {
        let pairs = [
            ("urgent hazard urgent hazard", "urgent hazard"),
            ("leak leak leak", "leak"),
            ("one two three four", "four five six"),
        ];
        for (a, b) in pairs {
            let s = sim(a, b);
            assert!((0.0..=1.0).contains(&s), "{a:?} vs {b:?} scored {s}");
        }
    }

    #[test]
    fn punctuation_is_part_of_the_token() {
        // Only whitespace splits tokens.
        assert_eq!(sim("pothole.", "pothole"), 0.0);
    }
}
