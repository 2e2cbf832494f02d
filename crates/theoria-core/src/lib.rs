use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("discovery failed: {0}")]
    Discovery(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("index error: {0}")]
    Index(String),
    #[error("cache error: {0}")]
    Cache(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

/// A document's content type, as determined by the ingester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentType {
    Html,
    Markdown,
    Pdf,
}

/// Document metadata. `id` is unique within an index; for web pages it is the
/// canonicalized URL. Never mutated in place: reindexing replaces the record
/// atomically via `Index::add_document`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMeta {
    pub id: String,
    pub title: String,
    pub url: Option<String>,
    pub source_path: Option<String>,
    pub content_type: ContentType,
    pub last_indexed_at_epoch_s: u64,
}

/// A single (term, document) posting: term frequency plus the set of token
/// offsets at which the term occurs. `term_frequency == positions.len()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: String,
    pub term_frequency: u32,
    pub positions: BTreeSet<u32>,
}

/// A parsed search query: required terms, optional terms, and phrases, each
/// already run through the tokenizer/stemmer. Empty when all three are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedQuery {
    pub required_terms: Vec<String>,
    pub optional_terms: Vec<String>,
    pub phrases: Vec<Vec<String>>,
}

impl ParsedQuery {
    pub fn is_empty(&self) -> bool {
        self.required_terms.is_empty() && self.optional_terms.is_empty() && self.phrases.is_empty()
    }

    /// `required ∪ optional ∪ flatten(phrases)`, duplicates retained.
    pub fn all_terms(&self) -> Vec<String> {
        let mut out = Vec::new();
        out.extend(self.required_terms.iter().cloned());
        out.extend(self.optional_terms.iter().cloned());
        for phrase in &self.phrases {
            out.extend(phrase.iter().cloned());
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    Web,
    Indexed,
}

/// One ranked result row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub title: String,
    pub url: Option<String>,
    pub snippet: String,
    pub score: f64,
    pub source_type: SourceType,
    pub is_scholarly: bool,
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub total_matches: usize,
    pub elapsed_milliseconds: u64,
    pub items: Vec<SearchResultItem>,
}

impl SearchResult {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            total_matches: 0,
            elapsed_milliseconds: 0,
            items: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamPhase {
    Discovery,
    Scored,
}

impl StreamPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamPhase::Discovery => "discovery",
            StreamPhase::Scored => "scored",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamedSearchEvent {
    pub phase: StreamPhase,
    pub result: SearchResult,
}

/// One (url, title, snippet) tuple surfaced by discovery, before dedup/fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryHit {
    pub url: String,
    pub title: String,
    pub snippet: String,
}

/// A third-party web-search scraper: candidate-URL discovery (C3).
#[async_trait]
pub trait DiscoveryProvider: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<DiscoveryHit>>;
}

/// The result of attempting to fetch and extract a single candidate page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageFetch {
    pub url: String,
    pub final_url: String,
    pub success: bool,
    pub title: Option<String>,
    pub text: Option<String>,
    pub error: Option<String>,
}

/// A concrete page fetcher: one URL in, one fetch-or-failure record out.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(&self, url: &str) -> PageFetch;
}

/// Capability contract for tokenization (C1): text in, stemmed/stop-word
/// filtered tokens out.
pub trait Tokenize: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<String>;
}

/// Capability contract for ranking (C5): score a document against a set of
/// query terms.
pub trait Score: Send + Sync {
    fn score(&self, query_terms: &[String], doc_id: &str) -> f64;
}
