use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::{clean_token, KeywordStrategy};

/// Keyword-bearing meta attributes, checked together. `article:tag`
/// usually appears once per tag; `keywords` carries one delimited string.
static KEYWORD_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"meta[name="keywords"]"#,
        r#"meta[name="Keywords"]"#,
        r#"meta[name="news_keywords"]"#,
        r#"meta[property="article:tag"]"#,
        r#"meta[property="keywords"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("static selector"))
    .collect()
});

/// Divider characters in priority order for the single-raw-string case.
const DIVIDERS: &[&str] = &[",", ";", " ", "&amp;"];

pub struct MetaTags;

impl KeywordStrategy for MetaTags {
    fn name(&self) -> &'static str {
        "MetaTags"
    }

    fn extract(&self, _page_text: &str, document: &Html) -> Vec<String> {
        let mut raw: Vec<String> = Vec::new();
        for selector in KEYWORD_SELECTORS.iter() {
            for element in document.select(selector) {
                if let Some(content) = element.attr("content") {
                    let content = content.trim();
                    if !content.is_empty() {
                        raw.push(content.to_string());
                    }
                }
            }
        }

        if raw.len() == 1 {
            let only = &raw[0];
            match DIVIDERS.iter().find(|d| only.contains(*d)) {
                Some(divider) => {
                    return only
                        .split(divider)
                        .map(clean_token)
                        .filter(|t| !t.is_empty())
                        .collect();
                }
                // a sole undivided value is discarded; longstanding quirk
                // kept pending a product decision
                None => return Vec::new(),
            }
        }

        raw.iter()
            .map(|t| clean_token(t))
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        MetaTags.extract("", &document)
    }

    #[test]
    fn splits_single_comma_string() {
        let html = r#"<html><head>
            <meta name="keywords" content="rust, linux, systems">
        </head></html>"#;
        assert_eq!(extract(html), vec!["rust", "linux", "systems"]);
    }

    #[test]
    fn comma_beats_semicolon_and_space() {
        let html = r#"<html><head>
            <meta name="keywords" content="a b, c d">
        </head></html>"#;
        // split on the comma, not the spaces
        assert_eq!(extract(html), vec!["a b", "c d"]);
    }

    #[test]
    fn semicolon_divider() {
        let html = r#"<html><head>
            <meta name="keywords" content="alpha;beta;gamma">
        </head></html>"#;
        assert_eq!(extract(html), vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn multiple_article_tags_are_discrete() {
        let html = r#"<html><head>
            <meta property="article:tag" content="rust">
            <meta property="article:tag" content="async io">
        </head></html>"#;
        assert_eq!(extract(html), vec!["rust", "async io"]);
    }

    #[test]
    fn sole_undivided_keyword_is_discarded() {
        let html = r#"<html><head>
            <meta name="keywords" content="monorail">
        </head></html>"#;
        assert!(extract(html).is_empty());
    }

    #[test]
    fn quoted_tokens_are_cleaned() {
        let html = r#"<html><head>
            <meta name="keywords" content="&quot;rust&quot;, &quot;linux&quot;">
        </head></html>"#;
        assert_eq!(extract(html), vec!["rust", "linux"]);
    }

    #[test]
    fn no_keywords_yields_empty() {
        assert!(extract("<html><head></head><body></body></html>").is_empty());
    }
}
