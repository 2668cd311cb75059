use scraper::Html;
use serde::{Deserialize, Serialize};

use crate::extract::{get_description, Extractor};
use crate::similarity::{SimilarityEngine, SimilarityOptions, DEFAULT_THRESHOLD};
use crate::urlnorm::{NormalizeOptions, UrlNormalizer};

/// The payload an external collaborator posts to the bookmark server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookmarkDraft {
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
}

/// A bookmark already known to the server, as returned by its search.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteBookmark {
    pub id: u64,
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    pub bookmark_id: u64,
    pub score: f64,
}

/// Assemble a draft for the captured page: inferred description plus the
/// keyword cascade's output.
pub fn build_draft(
    extractor: &Extractor,
    url: &str,
    title: Option<&str>,
    page_text: &str,
    document: &Html,
    folder: Option<String>,
) -> anyhow::Result<BookmarkDraft> {
    let description = get_description(document);
    let tags = extractor.get_keywords(page_text, document)?;

    Ok(BookmarkDraft {
        url: url.to_string(),
        title: title.map(|t| t.to_string()),
        description: (!description.is_empty()).then_some(description),
        tags,
        folder,
    })
}

/// "Does this look like a bookmark we already have?"
///
/// A normalized-URL match is definitive and scores 1.0. Failing that,
/// titles are compared with Jaro-Winkler and the best hit at or above the
/// default threshold is reported.
pub struct DuplicateDetector {
    normalizer: UrlNormalizer,
    engine: SimilarityEngine,
}

impl Default for DuplicateDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl DuplicateDetector {
    pub fn new() -> Self {
        Self {
            normalizer: UrlNormalizer::new(),
            engine: SimilarityEngine::new(),
        }
    }

    pub fn find_duplicate(
        &self,
        url: &str,
        title: Option<&str>,
        existing: &[RemoteBookmark],
    ) -> Option<DuplicateMatch> {
        let norm_opts = NormalizeOptions::default();
        for bookmark in existing {
            if self.normalizer.equivalent(url, &bookmark.url, norm_opts) {
                log::debug!("duplicate by url: bookmark {}", bookmark.id);
                return Some(DuplicateMatch {
                    bookmark_id: bookmark.id,
                    score: 1.0,
                });
            }
        }

        let title = title?;
        let scored = self.engine.batch_similarity_check(
            title,
            existing,
            DEFAULT_THRESHOLD,
            SimilarityOptions::default(),
            |b| b.title.as_deref(),
        );
        scored.first().map(|best| DuplicateMatch {
            bookmark_id: best.candidate.id,
            score: best.similarity,
        })
    }
}
