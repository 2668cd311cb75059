use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;

use super::KeywordStrategy;

/// IEEE Xplore embeds its document metadata as a JS assignment rather
/// than structured markup.
static XPL_METADATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)xplGlobal\.document\.metadata\s*=\s*(\{.*?\});").expect("static regex")
});

pub struct XplMetadata;

impl KeywordStrategy for XplMetadata {
    fn name(&self) -> &'static str {
        "XplMetadata"
    }

    fn extract(&self, page_text: &str, _document: &Html) -> Vec<String> {
        let Some(captures) = XPL_METADATA.captures(page_text) else {
            return Vec::new();
        };

        let metadata: Value = match serde_json::from_str(&captures[1]) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("unparseable xplGlobal metadata: {e}");
                return Vec::new();
            }
        };

        // keywords is an array of groups, each carrying a kwd array
        metadata
            .get("keywords")
            .and_then(Value::as_array)
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(|group| group.get("kwd").and_then(Value::as_array))
                    .flatten()
                    .filter_map(Value::as_str)
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}
