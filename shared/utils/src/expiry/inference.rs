//! Expiry Inferencer
//!
//! Two passes over the text:
//! 1. lines containing an expiry keyword: latest parseable date on any of them
//! 2. only if pass 1 found nothing: latest parseable date anywhere
//!
//! A keyword hit always beats the global scan, even when a later date exists
//! on an unlabelled line.

use chrono::NaiveDate;
use vtrack_models::InferredExpiry;

use super::parser::parse_date;
use super::scanner::scan_dates;

/// Phrases that mark a line as talking about validity or expiry.
/// Matched by lowercase containment, not as whole words.
pub const EXPIRY_KEYWORDS: &[&str] = &[
    "valid",
    "expiry",
    "upto",
    "up to",
    "till",
    "valid till",
    "valid upto",
    "valid up to",
    "expiry date",
    "date of expiry",
    "expires on",
    "valid until",
    "validity",
];

/// Picks the most probable expiry date out of a scanned text blob.
#[derive(Debug, Clone)]
pub struct ExpiryInferencer {
    keywords: Vec<String>,
}

impl Default for ExpiryInferencer {
    fn default() -> Self {
        Self {
            keywords: EXPIRY_KEYWORDS.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl ExpiryInferencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the keyword set. Keywords are lowercased.
    pub fn with_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Best-guess expiry date, or `None` when nothing in the text parses.
    pub fn infer(&self, text: &str) -> Option<NaiveDate> {
        self.keyword_candidate(text)
            .or_else(|| latest_date(text))
    }

    /// Same as [`infer`](Self::infer) but keeps the text the date came from.
    pub fn infer_expiry(&self, text: &str) -> Option<InferredExpiry> {
        self.infer(text).map(|date| InferredExpiry::new(date, text))
    }

    fn keyword_candidate(&self, text: &str) -> Option<NaiveDate> {
        text.split('\n')
            .filter(|line| self.has_keyword(line))
            .filter_map(latest_date)
            .max()
    }

    fn has_keyword(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k.as_str()))
    }
}

fn latest_date(text: &str) -> Option<NaiveDate> {
    scan_dates(text).into_iter().filter_map(parse_date).max()
}
