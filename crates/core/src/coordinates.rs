//! Coordinate extraction from free-form location strings.
//!
//! Location text is tried against an ordered chain of [`CoordinateFormat`]
//! parsers. The first format whose pattern matches decides the outcome: if its
//! numbers are out of bounds the result is `None`, later formats are not
//! consulted. Extraction never errors and never guesses.

use std::sync::LazyLock;

use regex::Regex;

use crate::geo::Coordinates;

/// A signed decimal number such as `40`, `-74.0060` or `+12.5`.
const NUMBER: &str = r"[-+]?\d+(?:\.\d+)?";

/// Whole-string `lat,lng`, the canonical form produced by `Coordinates`' `Display`.
static PLAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^\s*({NUMBER})\s*,\s*({NUMBER})\s*$")).expect("valid regex")
});

/// `lat: X, lng: Y` (also accepts `=` and `lon`).
static LABELLED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\blat\s*[:=]\s*({NUMBER})\s*,?\s*\b(?:lng|lon)\s*[:=]\s*({NUMBER})"
    ))
    .expect("valid regex")
});

/// `latitude: X, longitude: Y`.
static VERBOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\blatitude\s*[:=]\s*({NUMBER})\s*,?\s*\blongitude\s*[:=]\s*({NUMBER})"
    ))
    .expect("valid regex")
});

/// `(lat, lng)` anywhere in the string, e.g. `Main St (40.71, -74.00)`.
static PARENTHESIZED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\(\s*({NUMBER})\s*,\s*({NUMBER})\s*\)")).expect("valid regex")
});

/// One supported location-text format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateFormat {
    Plain,
    Labelled,
    Verbose,
    Parenthesized,
}

/// Formats in the order they are tried.
pub const COORDINATE_FORMATS: &[CoordinateFormat] = &[
    CoordinateFormat::Plain,
    CoordinateFormat::Labelled,
    CoordinateFormat::Verbose,
    CoordinateFormat::Parenthesized,
];

/// Outcome of running a single format parser.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormatMatch {
    /// The pattern did not match; the next format should be tried.
    NoMatch,
    /// The pattern matched but the numbers were unusable.
    Rejected,
    /// The pattern matched and both values are within bounds.
    Found(Coordinates),
}

impl CoordinateFormat {
    fn regex(self) -> &'static Regex {
        match self {
            Self::Plain => &PLAIN_RE,
            Self::Labelled => &LABELLED_RE,
            Self::Verbose => &VERBOSE_RE,
            Self::Parenthesized => &PARENTHESIZED_RE,
        }
    }

    /// Run this format's parser against `input`.
    pub fn parse(self, input: &str) -> FormatMatch {
        let Some(caps) = self.regex().captures(input) else {
            return FormatMatch::NoMatch;
        };

        let lat = caps.get(1).and_then(|m| m.as_str().parse::<f64>().ok());
        let lng = caps.get(2).and_then(|m| m.as_str().parse::<f64>().ok());

        match (lat, lng) {
            (Some(lat), Some(lng)) => Coordinates::new(lat, lng)
                .map(FormatMatch::Found)
                .unwrap_or(FormatMatch::Rejected),
            _ => FormatMatch::Rejected,
        }
    }
}

/// Extract coordinates from a free-form location string.
///
/// Returns `None` when no format matches or when the first matching format
/// yields out-of-range values.
pub fn extract_coordinates(location: &str) -> Option<Coordinates> {
    for format in COORDINATE_FORMATS {
        match format.parse(location) {
            FormatMatch::NoMatch => continue,
            FormatMatch::Rejected => return None,
            FormatMatch::Found(coords) => return Some(coords),
        }
    }
    None
}
