use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;

use super::KeywordStrategy;

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("static selector"));

static PUSH_ARG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)dataLayer\.push\(\s*(\{.*?\})\s*\)").expect("static regex")
});

/// Bare `undefined` literals inside the pushed object make it invalid
/// JSON; quoting them is enough to get it through the parser.
static UNDEFINED_LITERAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bundefined\b").expect("static regex"));

/// Google Tag Manager pages push their article metadata into
/// `dataLayer`; `content.keywords` carries a `|`-delimited string.
pub struct GtmDataLayer;

impl KeywordStrategy for GtmDataLayer {
    fn name(&self) -> &'static str {
        "GtmDataLayer"
    }

    fn extract(&self, _page_text: &str, document: &Html) -> Vec<String> {
        for element in document.select(&SCRIPT_SELECTOR) {
            let body = element.text().collect::<String>();
            if !body.contains("dataLayer.push") {
                continue;
            }

            let Some(captures) = PUSH_ARG.captures(&body) else {
                continue;
            };
            let raw = UNDEFINED_LITERAL.replace_all(&captures[1], r#""undefined""#);

            let payload: Value = match serde_json::from_str(&raw) {
                Ok(v) => v,
                Err(e) => {
                    log::debug!("skipping unparseable dataLayer payload: {e}");
                    continue;
                }
            };

            let keywords: Vec<String> = payload
                .get("content")
                .and_then(|c| c.get("keywords"))
                .and_then(Value::as_str)
                .map(|s| {
                    s.split('|')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect()
                })
                .unwrap_or_default();

            if !keywords.is_empty() {
                return keywords;
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        GtmDataLayer.extract("", &document)
    }

    #[test]
    fn pipe_delimited_keywords() {
        let html = r#"<html><head><script>
            dataLayer.push({"content": {"keywords": "rust|linux|cli"}});
        </script></head></html>"#;
        assert_eq!(extract(html), vec!["rust", "linux", "cli"]);
    }

    #[test]
    fn undefined_literals_are_tolerated() {
        let html = r#"<html><head><script>
            dataLayer.push({"author": undefined, "content": {"keywords": "a|b"}});
        </script></head></html>"#;
        assert_eq!(extract(html), vec!["a", "b"]);
    }

    #[test]
    fn unparseable_payload_falls_through_to_next_script() {
        let html = r#"<html><head>
            <script>dataLayer.push({broken: 'single quotes'});</script>
            <script>dataLayer.push({"content": {"keywords": "x|y"}});</script>
        </head></html>"#;
        assert_eq!(extract(html), vec!["x", "y"]);
    }

    #[test]
    fn missing_content_keywords_yields_empty() {
        let html = r#"<html><head><script>
            dataLayer.push({"page": "home"});
        </script></head></html>"#;
        assert!(extract(html).is_empty());
    }
}
