use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;

use super::{clean_token, KeywordStrategy};

/// Last resort: any `keywords: "..."` literal in the raw page text. The
/// greedy capture is bounded by the line since `.` does not cross
/// newlines.
static KEYWORDS_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"keywords:\s*"(.*)""#).expect("static regex"));

pub struct BruteForceRegex;

impl KeywordStrategy for BruteForceRegex {
    fn name(&self) -> &'static str {
        "BruteForceRegex"
    }

    fn extract(&self, page_text: &str, _document: &Html) -> Vec<String> {
        let Some(captures) = KEYWORDS_LITERAL.captures(page_text) else {
            return Vec::new();
        };

        captures[1]
            .split(',')
            .map(clean_token)
            .filter(|t| !t.is_empty())
            .collect()
    }
}
