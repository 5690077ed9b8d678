//! Canonical data model for the harvest and synthesis pipeline.
//!
//! The checkpoint files serialize `PostRef` and `PostRecord` as JSON arrays;
//! both document writers consume the `Chapter` list built from the corpus.

use serde::{Deserialize, Serialize};

/// Lightweight pointer to one remote post, produced by the catalog walk.
///
/// Immutable once created. The walker returns newest-first (API order); the
/// caller reverses to oldest-first before detail fetching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRef {
    pub title: String,
    /// Canonical post link. Unique key for deduplication.
    pub url: String,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
}

/// Fully fetched and normalized representation of one post.
///
/// `content` is cleaned text with `\n\n` between paragraphs. One record per
/// distinct url; records are never revised by a later run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRecord {
    pub title: String,
    pub content: String,
    #[serde(rename = "publishedAt")]
    pub published_at: String,
    /// Unique key; matches the `PostRef` url this record was fetched from.
    pub url: String,
}

/// One logical chapter, shared by the EPUB and PDF writers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub heading: String,
    pub subheading: String,
    pub paragraphs: Vec<String>,
}

/// Build the chapter list from the corpus, one chapter per record in corpus
/// order. Paragraphs are the `\n\n`-delimited segments of `content`; both
/// writers must render exactly this many paragraph blocks.
pub fn build_chapters(records: &[PostRecord]) -> Vec<Chapter> {
    records
        .iter()
        .map(|r| Chapter {
            heading: r.title.clone(),
            subheading: r.published_at.clone(),
            paragraphs: r.content.split("\n\n").map(str::to_string).collect(),
        })
        .collect()
}
