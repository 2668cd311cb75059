pub mod api;
pub mod bookmark;
pub mod cache;
pub mod extract;
pub mod lru;
pub mod options;
pub mod similarity;
pub mod storage;
pub mod urlnorm;

#[cfg(test)]
mod tests;

/// Split a raw tag string on commas and whitespace, lowercasing each tag.
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .flat_map(|value| value.split([' ', '\u{a0}']).filter(|value| !value.is_empty()))
        .map(|s| s.to_lowercase())
        .collect::<Vec<_>>()
}

/// De-duplicate while preserving first-seen order, comparing case-insensitively.
pub fn dedup_keywords(keywords: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    keywords
        .into_iter()
        .filter(|k| seen.insert(k.to_lowercase()))
        .collect()
}
