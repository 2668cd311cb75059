use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

use super::KeywordStrategy;

static NEXT_DATA_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("#__NEXT_DATA__").expect("static selector"));

/// Next.js hydration payload. Blog-style sites expose their post tags at
/// `props.pageProps.post.tags` as a comma-joined string.
pub struct NextData;

impl KeywordStrategy for NextData {
    fn name(&self) -> &'static str {
        "NextData"
    }

    fn extract(&self, _page_text: &str, document: &Html) -> Vec<String> {
        let Some(element) = document.select(&NEXT_DATA_SELECTOR).next() else {
            return Vec::new();
        };
        let body = element.text().collect::<String>();

        let json: Value = match serde_json::from_str(&body) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("malformed __NEXT_DATA__ payload: {e}");
                return Vec::new();
            }
        };

        json.pointer("/props/pageProps/post/tags")
            .and_then(Value::as_str)
            .map(|tags| {
                tags.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
