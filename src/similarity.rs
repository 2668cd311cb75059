//! Jaro-Winkler string similarity with pre-filter fast paths.
//!
//! Used for two things: spotting "this page is already bookmarked" by title,
//! and ranking noisy auto-extracted keywords against known tags.
//!
//! The character-overlap accept fast path returns the overlap ratio itself,
//! not the exact Jaro-Winkler value. Callers only rank with these scores,
//! which tolerates the approximation; anyone needing exact values should
//! disable the fast paths by comparing strings directly.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::lru::LruCache;

const SIMILARITY_CACHE_CAPACITY: usize = 500;

/// Separator for the memoization key; cannot appear in trimmed input of
/// interest, and an occasional collision only costs a cache slot.
const PAIR_SEPARATOR: char = '\u{1}';

/// Scanning a shared prefix stops here, per Winkler.
const MAX_PREFIX: usize = 4;
const PREFIX_SCALE: f64 = 0.1;

/// Near-perfect score at which batch scans stop early.
const EARLY_EXIT_SCORE: f64 = 0.98;
const EXACT_EXIT_SCORE: f64 = 0.99;

pub const DEFAULT_THRESHOLD: f64 = 0.75;

#[derive(Debug, Clone, Copy)]
pub struct SimilarityOptions {
    /// Lowercase + trim both inputs before comparison.
    pub normalize: bool,
    /// Threshold the pre-filter uses for its cheap rejection path.
    pub threshold: f64,
}

impl Default for SimilarityOptions {
    fn default() -> Self {
        Self {
            normalize: true,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatch {
    pub value: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct ScoredCandidate<T> {
    pub candidate: T,
    pub similarity: f64,
}

pub struct SimilarityEngine {
    cache: Mutex<LruCache<String, f64>>,
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimilarityEngine {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(LruCache::new(SIMILARITY_CACHE_CAPACITY)),
        }
    }

    /// Similarity in `[0, 1]`. Case/whitespace variants share one cache
    /// entry because normalization happens before lookup.
    pub fn similarity(&self, a: &str, b: &str, opts: SimilarityOptions) -> f64 {
        let (a, b) = if opts.normalize {
            (a.trim().to_lowercase(), b.trim().to_lowercase())
        } else {
            (a.to_string(), b.to_string())
        };

        let key = format!("{a}{PAIR_SEPARATOR}{b}");
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(score) = cache.get(&key) {
                return *score;
            }
        }

        let score = match prefilter(&a, &b, opts.threshold) {
            Some(fast) => fast,
            None => jaro_winkler(&a, &b),
        };

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, score);
        }
        score
    }

    pub fn is_similar(&self, a: &str, b: &str, threshold: f64, opts: SimilarityOptions) -> bool {
        self.similarity(a, b, opts) >= threshold
    }

    /// Best-scoring candidate at or above `threshold`, or `None`.
    ///
    /// The best score seen so far becomes the pre-filter threshold for the
    /// remaining candidates, so obviously-worse strings get rejected ever
    /// cheaper as the scan progresses. A near-perfect hit stops the scan.
    pub fn find_most_similar(
        &self,
        target: &str,
        candidates: &[&str],
        threshold: f64,
        opts: SimilarityOptions,
    ) -> Option<SimilarityMatch> {
        let mut best: Option<SimilarityMatch> = None;
        let mut effective = threshold;

        for candidate in candidates {
            let score = self.similarity(
                target,
                candidate,
                SimilarityOptions {
                    threshold: effective,
                    ..opts
                },
            );
            if score >= threshold && best.as_ref().map(|b| score > b.score).unwrap_or(true) {
                effective = score;
                best = Some(SimilarityMatch {
                    value: candidate.to_string(),
                    score,
                });
                if score >= EARLY_EXIT_SCORE {
                    break;
                }
            }
        }

        best
    }

    /// Score every candidate's title against `target`, returning those at
    /// or above `threshold` sorted by similarity descending. Candidates
    /// without a title are skipped. An exact match ends the scan.
    pub fn batch_similarity_check<'a, T>(
        &self,
        target: &str,
        candidates: &'a [T],
        threshold: f64,
        opts: SimilarityOptions,
        title_of: impl Fn(&T) -> Option<&str>,
    ) -> Vec<ScoredCandidate<&'a T>> {
        let mut scored = Vec::new();

        for candidate in candidates {
            let title = match title_of(candidate) {
                Some(t) => t,
                None => continue,
            };
            let score = self.similarity(target, title, opts);
            if score >= threshold {
                scored.push(ScoredCandidate {
                    candidate,
                    similarity: score,
                });
                if score >= EXACT_EXIT_SCORE {
                    break;
                }
            }
        }

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored
    }
}

/// Cheap short-circuits before the full Jaro-Winkler pass.
fn prefilter(a: &str, b: &str, threshold: f64) -> Option<f64> {
    if a == b {
        return Some(1.0);
    }
    if a.is_empty() || b.is_empty() {
        return Some(0.0);
    }

    let (short, long) = if a.chars().count() <= b.chars().count() {
        (a, b)
    } else {
        (b, a)
    };
    let short_len = short.chars().count() as f64;
    let long_len = long.chars().count() as f64;
    let length_ratio = short_len / long_len;

    if length_ratio < 0.5 {
        return Some(0.0);
    }

    let set_a: HashSet<char> = a.chars().collect();
    let set_b: HashSet<char> = b.chars().collect();
    let shared = set_a.intersection(&set_b).count() as f64;
    let union = set_a.union(&set_b).count() as f64;
    let overlap = if union > 0.0 { shared / union } else { 0.0 };

    if overlap < 0.6 * threshold {
        return Some(0.0);
    }
    // high overlap on similar lengths: good enough as an approximation
    if overlap > 0.9 && length_ratio > 0.9 {
        return Some(overlap);
    }

    None
}

fn jaro(a: &[char], b: &[char]) -> f64 {
    let l1 = a.len();
    let l2 = b.len();
    if l1 == 0 && l2 == 0 {
        return 1.0;
    }
    if l1 == 0 || l2 == 0 {
        return 0.0;
    }

    let window = (l1.max(l2) / 2).saturating_sub(1);
    let mut a_matched = vec![false; l1];
    let mut b_matched = vec![false; l2];
    let mut matches = 0usize;

    for (i, ca) in a.iter().enumerate() {
        let lo = i.saturating_sub(window);
        let hi = (i + window + 1).min(l2);
        for j in lo..hi {
            if !b_matched[j] && b[j] == *ca {
                a_matched[i] = true;
                b_matched[j] = true;
                matches += 1;
                break;
            }
        }
    }

    if matches == 0 {
        return 0.0;
    }

    // transpositions: matched characters compared in order
    let mut transpositions = 0usize;
    let mut j = 0usize;
    for (i, matched) in a_matched.iter().enumerate() {
        if !matched {
            continue;
        }
        while !b_matched[j] {
            j += 1;
        }
        if a[i] != b[j] {
            transpositions += 1;
        }
        j += 1;
    }

    let m = matches as f64;
    let t = (transpositions / 2) as f64;
    (m / l1 as f64 + m / l2 as f64 + (m - t) / m) / 3.0
}

fn jaro_winkler(a: &str, b: &str) -> f64 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let jaro_score = jaro(&a_chars, &b_chars);

    let prefix = a_chars
        .iter()
        .zip(b_chars.iter())
        .take(MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();

    jaro_score + prefix as f64 * PREFIX_SCALE * (1.0 - jaro_score)
}
