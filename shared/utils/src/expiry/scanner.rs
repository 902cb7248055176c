//! Date Scanner
//!
//! Finds date-shaped substrings in free text. No calendar validation happens
//! here: `99/99/9999` is a match, it just will not parse.

use once_cell::sync::Lazy;
use regex::Regex;

/// `DD<sep>MM<sep>YYYY` and `YYYY<sep>MM<sep>DD`, separators `/`, `-`, `.`.
static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\d{2}[/\-.]\d{2}[/\-.]\d{4}",
        r"\d{4}[/\-.]\d{2}[/\-.]\d{2}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("date pattern is a valid regex"))
    .collect()
});

/// Every date-shaped substring of `text`, ordered by position.
///
/// Each pattern is matched independently, so a substring matching both
/// shapes is reported once per shape.
pub fn scan_dates(text: &str) -> Vec<&str> {
    let mut matches: Vec<(usize, &str)> = DATE_PATTERNS
        .iter()
        .flat_map(|pattern| pattern.find_iter(text).map(|m| (m.start(), m.as_str())))
        .collect();
    matches.sort_by_key(|(start, _)| *start);
    matches.into_iter().map(|(_, raw)| raw).collect()
}
