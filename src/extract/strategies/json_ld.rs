use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

use super::{clean_token, KeywordStrategy};

static SCRIPT_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("static selector")
});

/// Structured-data keywords. Publishers disagree wildly on the shape of
/// `keywords`, so several variants are accepted: a plain array, a
/// comma-joined string, `tag:`-prefixed strings, and term-code objects.
/// Keywords may also hang off an `Article` inside `@graph`, or off
/// `mainEntity`.
pub struct JsonLd;

impl KeywordStrategy for JsonLd {
    fn name(&self) -> &'static str {
        "JsonLd"
    }

    fn extract(&self, _page_text: &str, document: &Html) -> Vec<String> {
        for element in document.select(&SCRIPT_SELECTOR) {
            let body = element.text().collect::<String>();
            let json: Value = match serde_json::from_str(&body) {
                Ok(v) => v,
                Err(e) => {
                    log::debug!("skipping malformed JSON-LD script: {e}");
                    continue;
                }
            };
            let keywords = keywords_from(&json);
            if !keywords.is_empty() {
                return keywords;
            }
        }
        Vec::new()
    }
}

fn keywords_from(json: &Value) -> Vec<String> {
    if let Some(kw) = json.get("keywords") {
        let parsed = parse_keywords_value(kw);
        if !parsed.is_empty() {
            return parsed;
        }
    }

    // @graph: take the Article member's keywords
    if let Some(graph) = json.get("@graph").and_then(Value::as_array) {
        for member in graph {
            if type_matches(member, "Article") {
                if let Some(kw) = member.get("keywords") {
                    let parsed = parse_keywords_value(kw);
                    if !parsed.is_empty() {
                        return parsed;
                    }
                }
            }
        }
    }

    if let Some(kw) = json.get("mainEntity").and_then(|m| m.get("keywords")) {
        return parse_keywords_value(kw);
    }

    Vec::new()
}

fn type_matches(value: &Value, wanted: &str) -> bool {
    match value.get("@type") {
        Some(Value::String(t)) => t == wanted,
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some(wanted)),
        _ => false,
    }
}

fn parse_keywords_value(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => {
                    let s = s.strip_prefix("tag:").unwrap_or(s);
                    let cleaned = clean_token(s);
                    (!cleaned.is_empty()).then_some(cleaned)
                }
                Value::Object(obj) => obj
                    .get("termCode")
                    .and_then(|tc| tc.get("label"))
                    .and_then(Value::as_str)
                    .map(|s| clean_token(s))
                    .filter(|s| !s.is_empty()),
                _ => None,
            })
            .collect(),
        Value::String(s) => s
            .split(',')
            .map(clean_token)
            .filter(|t| !t.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        JsonLd.extract("", &document)
    }

    fn ld(script: &str) -> String {
        format!(
            r#"<html><head><script type="application/ld+json">{script}</script></head></html>"#
        )
    }

    #[test]
    fn keywords_as_array() {
        let html = ld(r#"{"keywords": ["rust", "linux"]}"#);
        assert_eq!(extract(&html), vec!["rust", "linux"]);
    }

    #[test]
    fn keywords_as_comma_string() {
        let html = ld(r#"{"keywords": "rust, linux"}"#);
        assert_eq!(extract(&html), vec!["rust", "linux"]);
    }

    #[test]
    fn tag_prefixed_strings() {
        let html = ld(r#"{"keywords": ["tag:rust", "tag:linux"]}"#);
        assert_eq!(extract(&html), vec!["rust", "linux"]);
    }

    #[test]
    fn term_code_objects() {
        let html = ld(
            r#"{"keywords": [{"termCode": {"label": "networking"}}, {"termCode": {"label": "tcp"}}]}"#,
        );
        assert_eq!(extract(&html), vec!["networking", "tcp"]);
    }

    #[test]
    fn graph_article_keywords() {
        let html = ld(
            r#"{"@graph": [
                {"@type": "WebSite", "name": "site"},
                {"@type": "Article", "keywords": "a, b"}
            ]}"#,
        );
        assert_eq!(extract(&html), vec!["a", "b"]);
    }

    #[test]
    fn main_entity_keywords() {
        let html = ld(r#"{"mainEntity": {"keywords": ["x", "y"]}}"#);
        assert_eq!(extract(&html), vec!["x", "y"]);
    }

    #[test]
    fn malformed_script_is_skipped_next_one_wins() {
        let html = format!(
            r#"<html><head>
            <script type="application/ld+json">{{broken</script>
            <script type="application/ld+json">{{"keywords": ["ok"]}}</script>
            </head></html>"#
        );
        assert_eq!(extract(&html), vec!["ok"]);
    }

    #[test]
    fn no_keywords_field_yields_empty() {
        let html = ld(r#"{"name": "nothing here"}"#);
        assert!(extract(&html).is_empty());
    }
}
