//! Keyword extraction strategies, one per site convention.
//!
//! Each strategy inspects the page independently and returns whatever
//! candidates it finds; the cascade in `extract` runs them in the fixed
//! order below and stops at the first non-empty result. Strategies never
//! fail: malformed embedded data is logged and treated as "found nothing"
//! so the cascade can move on.

mod brute;
mod github;
mod gtm;
mod json_ld;
mod meta_tags;
mod next_data;
mod rel_anchors;
mod vendor;

pub use brute::BruteForceRegex;
pub use github::GithubTopics;
pub use gtm::GtmDataLayer;
pub use json_ld::JsonLd;
pub use meta_tags::MetaTags;
pub use next_data::NextData;
pub use rel_anchors::RelAnchors;
pub use vendor::XplMetadata;

use scraper::Html;

pub trait KeywordStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn extract(&self, page_text: &str, document: &Html) -> Vec<String>;
}

/// The cascade, in priority order. First non-empty result wins; no
/// merging across strategies.
pub static STRATEGIES: &[&dyn KeywordStrategy] = &[
    &MetaTags,
    &RelAnchors {
        rel: "tag",
        strategy_name: "RelTag",
    },
    &RelAnchors {
        rel: "category",
        strategy_name: "RelCategory",
    },
    &JsonLd,
    &GtmDataLayer,
    &GithubTopics,
    &NextData,
    &XplMetadata,
    &BruteForceRegex,
];

/// Trim whitespace and a single pair of surrounding quotes from a token.
pub(crate) fn clean_token(token: &str) -> String {
    token
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cascade_order_is_fixed() {
        let names: Vec<&str> = STRATEGIES.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            vec![
                "MetaTags",
                "RelTag",
                "RelCategory",
                "JsonLd",
                "GtmDataLayer",
                "GithubTopics",
                "NextData",
                "XplMetadata",
                "BruteForceRegex",
            ]
        );
    }

    #[test]
    fn clean_token_strips_quotes_and_whitespace() {
        assert_eq!(clean_token(r#" "rust" "#), "rust");
        assert_eq!(clean_token("'linux'"), "linux");
        assert_eq!(clean_token("  plain  "), "plain");
    }
}
