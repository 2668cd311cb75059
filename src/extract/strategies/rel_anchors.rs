use scraper::{Html, Selector};

use super::KeywordStrategy;

/// Anchor text of `a[rel=...]` elements. WordPress-style sites mark tag
/// and category links this way.
pub struct RelAnchors {
    pub rel: &'static str,
    pub strategy_name: &'static str,
}

impl KeywordStrategy for RelAnchors {
    fn name(&self) -> &'static str {
        self.strategy_name
    }

    fn extract(&self, _page_text: &str, document: &Html) -> Vec<String> {
        let selector = match Selector::parse(&format!(r#"a[rel="{}"]"#, self.rel)) {
            Ok(s) => s,
            Err(e) => {
                log::debug!("rel anchor selector failed: {e:?}");
                return Vec::new();
            }
        };

        document
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_rel_tag_anchor_text() {
        let html = r#"<html><body>
            <a rel="tag" href="/t/one">Tag1</a>
            <a rel="tag" href="/t/two">Tag2</a>
            <a href="/plain">not a tag</a>
        </body></html>"#;
        let document = Html::parse_document(html);
        let strategy = RelAnchors {
            rel: "tag",
            strategy_name: "RelTag",
        };
        assert_eq!(strategy.extract("", &document), vec!["Tag1", "Tag2"]);
    }

    #[test]
    fn category_rel_is_separate() {
        let html = r#"<html><body>
            <a rel="category" href="/c/news">News</a>
        </body></html>"#;
        let document = Html::parse_document(html);
        let tags = RelAnchors {
            rel: "tag",
            strategy_name: "RelTag",
        };
        let categories = RelAnchors {
            rel: "category",
            strategy_name: "RelCategory",
        };
        assert!(tags.extract("", &document).is_empty());
        assert_eq!(categories.extract("", &document), vec!["News"]);
    }
}
