use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use super::KeywordStrategy;

/// GitHub topic markup, newest first down to the legacy attribute. The
/// first selector matching any element wins; later ones are not merged in.
static TOPIC_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        r#"a[class*="topic-tag"]"#,
        r#"a[data-view-component][title^="Topic:"]"#,
        r#"a[href^="/topics/"]"#,
        r#"a[data-ga-click="Topic, repository page"]"#,
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("static selector"))
    .collect()
});

pub struct GithubTopics;

impl KeywordStrategy for GithubTopics {
    fn name(&self) -> &'static str {
        "GithubTopics"
    }

    fn extract(&self, _page_text: &str, document: &Html) -> Vec<String> {
        for selector in TOPIC_SELECTORS.iter() {
            let topics: Vec<String> = document
                .select(selector)
                .map(|el| el.text().collect::<String>().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
            if !topics.is_empty() {
                return topics;
            }
        }
        Vec::new()
    }
}
