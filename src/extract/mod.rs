//! Metadata extraction: page description and keyword candidates.
//!
//! Pure over its inputs; the only state consulted is the option flags and
//! the tag vocabulary cache handed in at construction.

pub mod strategies;

use once_cell::sync::Lazy;
use scraper::{Html, Selector};

use crate::cache::{CacheKind, TagCache};
use crate::dedup_keywords;
use crate::options::{
    Options, OPT_AUTO_TAGS, OPT_EXTENDED_KEYWORDS, OPT_HEADLINE_MAX_DEPTH, OPT_REDUCE_KEYWORDS,
};
use strategies::STRATEGIES;

/// Description sources in fixed priority order: (selector, attribute).
static DESCRIPTION_SOURCES: Lazy<Vec<(Selector, &'static str)>> = Lazy::new(|| {
    [
        (r#"meta[property="og:description"]"#, "content"),
        (r#"meta[name="description"]"#, "content"),
        (r#"meta[name="twitter:description"]"#, "content"),
        (r#"meta[content][property="og:description"]"#, "content"),
        (r#"meta[name="og:description"]"#, "content"),
        (r#"link[rel="search"]"#, "title"),
        (r#"meta[http-equiv="description"]"#, "content"),
    ]
    .iter()
    .map(|(sel, attr)| (Selector::parse(sel).expect("static selector"), *attr))
    .collect()
});

/// First non-empty description among the known meta conventions, with
/// leading/trailing newline runs stripped before the final trim.
pub fn get_description(document: &Html) -> String {
    for (selector, attr) in DESCRIPTION_SOURCES.iter() {
        for element in document.select(selector) {
            if let Some(value) = element.attr(attr) {
                let cleaned = value
                    .trim_matches('\n')
                    .trim_matches('\r')
                    .trim()
                    .to_string();
                if !cleaned.is_empty() {
                    return cleaned;
                }
            }
        }
    }
    String::new()
}

pub struct Extractor<'a> {
    options: &'a Options,
    tags: &'a TagCache,
}

impl<'a> Extractor<'a> {
    pub fn new(options: &'a Options, tags: &'a TagCache) -> Self {
        Self { options, tags }
    }

    /// Run the strategy cascade over the page. Gated entirely by the
    /// `autoTags` option. The first strategy producing candidates is
    /// authoritative; its output is only reduced, never merged with a
    /// later strategy's.
    pub fn get_keywords(&self, page_text: &str, document: &Html) -> anyhow::Result<Vec<String>> {
        if !self.options.get_bool(OPT_AUTO_TAGS)? {
            return Ok(Vec::new());
        }

        for strategy in STRATEGIES {
            let candidates = strategy.extract(page_text, document);
            if !candidates.is_empty() {
                log::debug!(
                    "{} produced {} keyword candidate(s)",
                    strategy.name(),
                    candidates.len()
                );
                return self.reduce_keywords(candidates, false);
            }
        }

        if self.options.get_bool(OPT_EXTENDED_KEYWORDS)? {
            return self.derived_keywords(document);
        }

        Ok(Vec::new())
    }

    /// Fallback for pages where no strategy matched: mine the description
    /// text, then headline text at increasing depth. Derived words are
    /// pure noise without the vocabulary, so each pass reduces forcibly
    /// no matter what the reduce toggle says.
    fn derived_keywords(&self, document: &Html) -> anyhow::Result<Vec<String>> {
        let description = get_description(document);
        let candidates = words_of(&description);
        if !candidates.is_empty() {
            let reduced = self.reduce_keywords(candidates, true)?;
            if !reduced.is_empty() {
                log::debug!("keywords derived from description");
                return Ok(reduced);
            }
        }

        let max_depth = self.options.get_u64(OPT_HEADLINE_MAX_DEPTH)?.clamp(1, 6);
        for depth in 1..=max_depth {
            let selector = match Selector::parse(&format!("h{depth}")) {
                Ok(s) => s,
                Err(_) => continue,
            };
            let headline_words: Vec<String> = document
                .select(&selector)
                .flat_map(|el| words_of(&el.text().collect::<String>()))
                .collect();
            if headline_words.is_empty() {
                continue;
            }
            let reduced = self.reduce_keywords(headline_words, true)?;
            if !reduced.is_empty() {
                log::debug!("keywords derived from h{depth} headlines");
                return Ok(reduced);
            }
        }

        Ok(Vec::new())
    }

    /// Filter candidates down to the known tag vocabulary, case
    /// insensitively, preserving the candidates' original casing. With
    /// neither `force` nor the `reduceKeywords` option set the candidates
    /// pass through untouched. An unavailable or empty vocabulary yields
    /// an empty result: no keyword survives unvalidated.
    pub fn reduce_keywords(
        &self,
        candidates: Vec<String>,
        force: bool,
    ) -> anyhow::Result<Vec<String>> {
        if !force && !self.options.get_bool(OPT_REDUCE_KEYWORDS)? {
            return Ok(candidates);
        }

        let candidates = dedup_keywords(candidates);

        let vocabulary = match self.tags.cache_get(CacheKind::Keywords, false) {
            Ok(tags) => tags,
            Err(e) => {
                log::warn!("tag vocabulary unavailable, dropping all candidates: {e}");
                return Ok(Vec::new());
            }
        };
        let vocabulary: std::collections::HashSet<String> =
            vocabulary.into_iter().map(|t| t.to_lowercase()).collect();

        Ok(dedup_keywords(
            candidates
                .into_iter()
                .filter(|c| vocabulary.contains(&c.to_lowercase()))
                .collect(),
        ))
    }
}

/// Word candidates from free text: alphanumeric-trimmed tokens longer
/// than two characters.
fn words_of(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.chars().count() > 2)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_priority_order() {
        let html = r#"<html><head>
            <meta name="description" content="plain description">
            <meta property="og:description" content="og description">
        </head></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(get_description(&document), "og description");
    }

    #[test]
    fn description_falls_through_empty_sources() {
        let html = r#"<html><head>
            <meta property="og:description" content="">
            <meta name="twitter:description" content="from twitter">
        </head></html>"#;
        let document = Html::parse_document(html);
        assert_eq!(get_description(&document), "from twitter");
    }

    #[test]
    fn description_strips_newline_runs_and_trims() {
        let html = "<html><head><meta name=\"description\" content=\"\n\n  wrapped text  \n\"></head></html>";
        let document = Html::parse_document(html);
        assert_eq!(get_description(&document), "wrapped text");
    }

    #[test]
    fn description_empty_when_nothing_matches() {
        let document = Html::parse_document("<html><head></head></html>");
        assert_eq!(get_description(&document), "");
    }

    #[test]
    fn words_of_trims_punctuation_and_short_words() {
        assert_eq!(
            words_of("An in-depth look at the Rust IO model!"),
            vec!["in-depth", "look", "the", "Rust", "model"]
        );
    }
}
