//! URL canonicalization for equality checks and cache keys.
//!
//! Each step is independently toggleable. A URL that fails to parse is
//! returned unchanged; the caller compares whatever it has.

use std::sync::Mutex;

use url::Url;

use crate::lru::LruCache;

const NORMALIZE_CACHE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NormalizeOptions {
    /// Upgrade `http` to `https`.
    pub force_https: bool,
    /// Drop a leading `www.` host label.
    pub strip_www: bool,
    /// Sort query parameters lexicographically by key.
    pub sort_query: bool,
    /// Drop the fragment.
    pub strip_fragment: bool,
    /// Drop a single trailing slash, except on the bare root path.
    pub strip_trailing_slash: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            force_https: true,
            strip_www: true,
            sort_query: true,
            strip_fragment: true,
            strip_trailing_slash: true,
        }
    }
}

pub struct UrlNormalizer {
    // keyed by raw input + the exact option tuple; the same URL under a
    // different option set is a distinct entry
    cache: Mutex<LruCache<(String, NormalizeOptions), String>>,
}

impl Default for UrlNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlNormalizer {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(NORMALIZE_CACHE_CAPACITY)),
        }
    }

    pub fn normalize(&self, url: &str, opts: NormalizeOptions) -> String {
        let key = (url.to_string(), opts);
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&key) {
                return cached.clone();
            }
        }

        let normalized = normalize_uncached(url, opts);

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, normalized.clone());
        }
        normalized
    }

    pub fn equivalent(&self, a: &str, b: &str, opts: NormalizeOptions) -> bool {
        self.normalize(a, opts) == self.normalize(b, opts)
    }
}

fn normalize_uncached(url: &str, opts: NormalizeOptions) -> String {
    let mut parsed = match Url::parse(url) {
        Ok(u) => u,
        Err(e) => {
            log::debug!("normalize: unparseable url '{url}': {e}");
            return url.to_string();
        }
    };

    if opts.force_https && parsed.scheme() == "http" {
        let _ = parsed.set_scheme("https");
    }

    if opts.strip_www {
        if let Some(host) = parsed.host_str() {
            if let Some(stripped) = host.strip_prefix("www.") {
                let stripped = stripped.to_string();
                if parsed.set_host(Some(&stripped)).is_err() {
                    return url.to_string();
                }
            }
        }
    }

    if opts.sort_query {
        let mut pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if !pairs.is_empty() {
            // stable sort: equal keys keep their relative order
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            let query = pairs
                .iter()
                .fold(
                    url::form_urlencoded::Serializer::new(String::new()),
                    |mut s, (k, v)| {
                        s.append_pair(k, v);
                        s
                    },
                )
                .finish();
            parsed.set_query(Some(&query));
        }
    }

    if opts.strip_fragment {
        parsed.set_fragment(None);
    }

    if opts.strip_trailing_slash {
        let path = parsed.path().to_string();
        if path.len() > 1 {
            if let Some(trimmed) = path.strip_suffix('/') {
                parsed.set_path(trimmed);
            }
        }
    }

    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(url: &str) -> String {
        UrlNormalizer::new().normalize(url, NormalizeOptions::default())
    }

    #[test]
    fn upgrades_http_strips_www_and_trailing_slash() {
        assert_eq!(
            norm("http://WWW.Example.com/Path/"),
            "https://example.com/Path"
        );
    }

    #[test]
    fn sorts_query_parameters() {
        assert_eq!(
            norm("https://example.com/?b=2&a=1"),
            "https://example.com/?a=1&b=2"
        );
    }

    #[test]
    fn strips_fragment() {
        assert_eq!(norm("https://example.com/page#section"), "https://example.com/page");
    }

    #[test]
    fn preserves_root_slash() {
        assert_eq!(norm("https://example.com/"), "https://example.com/");
    }

    #[test]
    fn path_case_preserved() {
        assert_eq!(norm("https://example.com/CaseSensitive"), "https://example.com/CaseSensitive");
    }

    #[test]
    fn is_idempotent() {
        let normalizer = UrlNormalizer::new();
        let opts = NormalizeOptions::default();
        for url in [
            "http://WWW.Example.com/Path/?z=1&a=2#frag",
            "https://example.com/",
            "https://example.com/a/b/c/",
            "not a url at all",
        ] {
            let once = normalizer.normalize(url, opts);
            let twice = normalizer.normalize(&once, opts);
            assert_eq!(once, twice, "not idempotent for {url}");
        }
    }

    #[test]
    fn malformed_url_returned_unchanged() {
        assert_eq!(norm("not a valid url"), "not a valid url");
    }

    #[test]
    fn option_toggles_are_independent() {
        let normalizer = UrlNormalizer::new();
        let keep_www = NormalizeOptions {
            strip_www: false,
            ..Default::default()
        };
        assert_eq!(
            normalizer.normalize("http://www.example.com/a/", keep_www),
            "https://www.example.com/a"
        );

        let keep_fragment = NormalizeOptions {
            strip_fragment: false,
            ..Default::default()
        };
        assert_eq!(
            normalizer.normalize("https://example.com/a#x", keep_fragment),
            "https://example.com/a#x"
        );
    }

    #[test]
    fn distinct_option_tuples_are_distinct_cache_entries() {
        let normalizer = UrlNormalizer::new();
        let url = "http://www.example.com/a/";
        let with_defaults = normalizer.normalize(url, NormalizeOptions::default());
        let without_https = normalizer.normalize(
            url,
            NormalizeOptions {
                force_https: false,
                ..Default::default()
            },
        );
        assert_ne!(with_defaults, without_https);
    }

    #[test]
    fn equivalent_compares_normalized_forms() {
        let normalizer = UrlNormalizer::new();
        let opts = NormalizeOptions::default();
        assert!(normalizer.equivalent(
            "http://www.example.com/page?b=2&a=1",
            "https://example.com/page/?a=1&b=2#frag",
            opts
        ));
        assert!(!normalizer.equivalent(
            "https://example.com/page",
            "https://example.com/other",
            opts
        ));
    }
}
