//! C9: the live-search orchestrator — discovery, bounded parallel fetch,
//! transient indexing, BM25 scoring with title/domain boosts, and two-phase
//! streaming emission.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use theoria_core::{
    ContentType, DiscoveryHit, DiscoveryProvider, DocumentMeta, PageFetch, PageFetcher,
    SearchResult, SearchResultItem, SourceType, StreamPhase, StreamedSearchEvent,
};
use tokio::sync::{mpsc::Sender, Semaphore};
use tracing::{info_span, Instrument};

use crate::cache::{CacheKey, Mode as CacheMode, ResponseCache};
use crate::config::LiveSearchConfig;
use crate::index::Index;
use crate::robots::RobotsChecker;
use crate::{bm25, scholarly, snippet, tokenize};

pub struct LiveSearchEngine {
    discovery: Arc<dyn DiscoveryProvider>,
    fetcher: Arc<dyn PageFetcher>,
    robots: Option<Arc<RobotsChecker>>,
    cache: Option<Arc<ResponseCache>>,
    config: LiveSearchConfig,
}

impl LiveSearchEngine {
    pub fn new(
        discovery: Arc<dyn DiscoveryProvider>,
        fetcher: Arc<dyn PageFetcher>,
        config: LiveSearchConfig,
    ) -> Self {
        Self {
            discovery,
            fetcher,
            robots: None,
            cache: None,
            config,
        }
    }

    pub fn with_robots(mut self, robots: Arc<RobotsChecker>) -> Self {
        self.robots = Some(robots);
        self
    }

    /// The only state this engine carries across otherwise-independent
    /// requests: a bounded-TTL memoization of final results.
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Non-streaming: runs the whole pipeline and returns the final result,
    /// serving a fresh cache entry instead of re-running it when present.
    pub async fn search(&self, query: &str, top_n: usize) -> SearchResult {
        let cache_key = self.cache.as_ref().map(|_| CacheKey::new(CacheMode::Live, top_n, query));
        if let (Some(cache), Some(key)) = (self.cache.as_ref(), cache_key.as_ref()) {
            if let Some(hit) = cache.get(key) {
                return hit;
            }
        }

        let span = info_span!("live_search", query = query, top_n = top_n);
        let result = async {
            let Some(state) = self.discover_and_dedup(query, top_n).await else {
                return SearchResult::empty(query);
            };
            self.fetch_and_score(query, top_n, state).await
        }
        .instrument(span)
        .await;

        if let (Some(cache), Some(key)) = (self.cache.as_ref(), cache_key) {
            cache.put(key, result.clone());
        }
        result
    }

    /// Streaming: sends `discovery` then `scored` on `events`, in order,
    /// flushing (i.e. sending) the first before computing the second.
    pub async fn search_streaming(&self, query: &str, top_n: usize, events: Sender<StreamedSearchEvent>) {
        let span = info_span!("live_search", query = query, top_n = top_n);
        async {
            let Some(state) = self.discover_and_dedup(query, top_n).await else {
                let _ = events
                    .send(StreamedSearchEvent {
                        phase: StreamPhase::Discovery,
                        result: SearchResult::empty(query),
                    })
                    .await;
                let _ = events
                    .send(StreamedSearchEvent {
                        phase: StreamPhase::Scored,
                        result: SearchResult::empty(query),
                    })
                    .await;
                return;
            };

            let discovery_result = SearchResult {
                query: query.to_string(),
                total_matches: state.deduped.len(),
                elapsed_milliseconds: 0,
                items: state.discovery_items.clone(),
            };
            let _ = events
                .send(StreamedSearchEvent {
                    phase: StreamPhase::Discovery,
                    result: discovery_result,
                })
                .await;

            let scored = self.fetch_and_score(query, top_n, state).await;
            let _ = events
                .send(StreamedSearchEvent {
                    phase: StreamPhase::Scored,
                    result: scored,
                })
                .await;
        }
        .instrument(span)
        .await
    }

    /// Steps 1-4 + building the discovery-phase items, shared by both entry
    /// points. `None` means "empty result" (blank query or empty discovery).
    async fn discover_and_dedup(&self, query: &str, top_n: usize) -> Option<PipelineState> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return None;
        }

        let augmented = scholarly::augment_query(trimmed);
        let hits = async {
            self.discovery
                .search(&augmented, self.config.max_discovery_results)
                .await
                .unwrap_or_default()
        }
        .instrument(info_span!("discovery"))
        .await;

        let deduped = dedup_by_canonical_url(hits);
        if deduped.is_empty() {
            return None;
        }

        let discovery_items = deduped
            .iter()
            .take(top_n)
            .map(|hit| {
                let domain = host_of(&hit.url);
                let is_scholarly = domain.as_deref().map(scholarly::is_scholarly_domain).unwrap_or(false);
                SearchResultItem {
                    title: hit.title.clone(),
                    url: Some(hit.url.clone()),
                    snippet: hit.snippet.clone(),
                    score: 0.0,
                    source_type: SourceType::Web,
                    is_scholarly,
                    domain,
                }
            })
            .collect();

        Some(PipelineState { deduped, discovery_items })
    }

    /// Steps 4-9: DNS prefetch, bounded parallel fetch, indexing, scoring.
    async fn fetch_and_score(&self, query: &str, top_n: usize, state: PipelineState) -> SearchResult {
        let started = Instant::now();
        let PipelineState { deduped, discovery_items } = state;

        prefetch_dns(&deduped);

        let pages = self.fetch_all(&deduped).instrument(info_span!("fetch")).await;

        let index = Index::new();
        {
            let _index_span = info_span!("index", pages = pages.len()).entered();
            let titles_by_url: HashMap<&str, &str> =
                deduped.iter().map(|hit| (hit.url.as_str(), hit.title.as_str())).collect();

            for page in &pages {
                if !page.success {
                    continue;
                }
                let Some(text) = page.text.as_deref() else { continue };
                if text.trim().is_empty() {
                    continue;
                }
                let title = page
                    .title
                    .clone()
                    .filter(|t| !t.is_empty())
                    .or_else(|| titles_by_url.get(page.url.as_str()).map(|t| t.to_string()))
                    .unwrap_or_default();
                index.add_document(
                    DocumentMeta {
                        id: page.final_url.clone(),
                        title,
                        url: Some(page.final_url.clone()),
                        source_path: None,
                        content_type: ContentType::Html,
                        last_indexed_at_epoch_s: 0,
                    },
                    text,
                );
            }
        }

        if index.document_count() == 0 {
            return SearchResult {
                query: query.to_string(),
                total_matches: deduped.len(),
                elapsed_milliseconds: started.elapsed().as_millis() as u64,
                items: discovery_items.into_iter().take(top_n).collect(),
            };
        }

        let _score_span = info_span!("score").entered();
        let query_terms = tokenize::tokenize(query);
        let query_term_set: HashSet<&String> = query_terms.iter().collect();
        let doc_ids = index.get_all_document_ids();

        let mut scored: Vec<(String, f64)> = doc_ids
            .into_iter()
            .map(|doc_id| {
                let score = scored_with_boosts(
                    &index,
                    &query_terms,
                    &query_term_set,
                    &doc_id,
                    self.config.bm25_k1,
                    self.config.bm25_b,
                );
                (doc_id, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let total_matches = scored.len();
        let mut items = Vec::with_capacity(top_n.min(scored.len()));
        for (doc_id, score) in scored.into_iter().take(top_n) {
            let Some(meta) = index.get_document(&doc_id) else { continue };
            let content = index.get_document_content(&doc_id).unwrap_or_default();
            let domain = host_of(&doc_id);
            let is_scholarly = domain.as_deref().map(scholarly::is_scholarly_domain).unwrap_or(false);
            items.push(SearchResultItem {
                title: meta.title,
                url: meta.url,
                snippet: snippet::generate(&content, &query_terms),
                score,
                source_type: SourceType::Web,
                is_scholarly,
                domain,
            });
        }

        SearchResult {
            query: query.to_string(),
            total_matches,
            elapsed_milliseconds: started.elapsed().as_millis() as u64,
            items,
        }
    }

    async fn fetch_all(&self, hits: &[DiscoveryHit]) -> Vec<PageFetch> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_fetches.max(1)));
        let per_page_timeout = self.config.per_page_timeout();

        let tasks: Vec<_> = hits
            .iter()
            .map(|hit| {
                let url = hit.url.clone();
                let semaphore = semaphore.clone();
                let fetcher = self.fetcher.clone();
                let robots = self.robots.clone();
                async move {
                    let _permit = semaphore.acquire().await;
                    if let Some(robots) = robots {
                        if !robots.is_allowed(&url).await {
                            return PageFetch {
                                url: url.clone(),
                                final_url: url,
                                success: false,
                                title: None,
                                text: None,
                                error: Some("disallowed by robots.txt".to_string()),
                            };
                        }
                    }
                    match tokio::time::timeout(per_page_timeout, fetcher.fetch_page(&url)).await {
                        Ok(page) => page,
                        Err(_) => PageFetch {
                            url: url.clone(),
                            final_url: url,
                            success: false,
                            title: None,
                            text: None,
                            error: Some("per-page fetch timeout".to_string()),
                        },
                    }
                }
                .instrument(info_span!("fetch_page", url = %hit.url))
            })
            .collect();

        futures_util::future::join_all(tasks).await
    }
}

struct PipelineState {
    deduped: Vec<DiscoveryHit>,
    discovery_items: Vec<SearchResultItem>,
}

fn scored_with_boosts(
    index: &Index,
    query_terms: &[String],
    query_term_set: &HashSet<&String>,
    doc_id: &str,
    k1: f64,
    b: f64,
) -> f64 {
    let mut score = bm25::score(index, query_terms, doc_id, k1, b);
    if score == 0.0 {
        return score;
    }

    if let Some(meta) = index.get_document(doc_id) {
        if !query_term_set.is_empty() {
            let title_terms: HashSet<String> = tokenize::tokenize(&meta.title).into_iter().collect();
            let matched = query_term_set.iter().filter(|t| title_terms.contains(t.as_str())).count();
            if matched > 0 {
                score *= 1.0 + 0.3 * (matched as f64 / query_term_set.len() as f64);
            }
        }
    }

    if let Some(domain) = host_of(doc_id) {
        if scholarly::is_scholarly_domain(&domain) {
            score *= scholarly::DOMAIN_BOOST;
        }
    }

    score
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
}

/// Lowercase, force https, drop `www.`, trim trailing `/`, drop fragment,
/// preserve path and query. First occurrence of each canonical form wins.
fn dedup_by_canonical_url(hits: Vec<DiscoveryHit>) -> Vec<DiscoveryHit> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(hits.len());
    for hit in hits {
        let Some(canonical) = canonicalize_url(&hit.url) else { continue };
        if seen.insert(canonical) {
            out.push(hit);
        }
    }
    out
}

fn canonicalize_url(raw: &str) -> Option<String> {
    let mut url = url::Url::parse(raw).ok()?;
    let _ = url.set_scheme("https");
    url.set_fragment(None);
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    let mut path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        path.pop();
    }
    let query = url.query().map(|q| format!("?{q}")).unwrap_or_default();
    Some(format!("https://{host}{path}{query}"))
}

fn prefetch_dns(hits: &[DiscoveryHit]) {
    let hosts: HashSet<String> = hits.iter().filter_map(|hit| host_of(&hit.url)).collect();
    for host in hosts {
        tokio::spawn(async move {
            let _ = tokio::net::lookup_host((host.as_str(), 443)).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_forces_https_drops_www_and_trailing_slash() {
        assert_eq!(
            canonicalize_url("http://www.jstor.org/x/").unwrap(),
            "https://jstor.org/x"
        );
    }

    #[test]
    fn canonicalize_drops_fragment_but_keeps_query() {
        assert_eq!(
            canonicalize_url("https://jstor.org/x?y=1#section").unwrap(),
            "https://jstor.org/x?y=1"
        );
    }

    #[test]
    fn dedup_keeps_first_occurrence_of_each_canonical_url() {
        let hits = vec![
            DiscoveryHit { url: "https://www.jstor.org/x/".into(), title: "A".into(), snippet: "".into() },
            DiscoveryHit { url: "http://jstor.org/x".into(), title: "B".into(), snippet: "".into() },
            DiscoveryHit { url: "https://jstor.org/x#frag".into(), title: "C".into(), snippet: "".into() },
        ];
        let deduped = dedup_by_canonical_url(hits);
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].title, "A");
    }

    #[test]
    fn host_of_strips_www() {
        assert_eq!(host_of("https://www.example.com/x").unwrap(), "example.com");
    }
}
