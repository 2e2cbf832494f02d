//! C8: indexed-search engine over an already-populated `Index` (the
//! non-live path — AND/phrase/content-type filtering then BM25 scoring).

use std::collections::HashSet;
use std::time::Instant;
use theoria_core::{ContentType, SearchResult, SearchResultItem, SourceType};

use crate::index::Index;
use crate::{bm25, query, scholarly, snippet};

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub content_type: Option<ContentType>,
    pub bm25_k1: f64,
    pub bm25_b: f64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            content_type: None,
            bm25_k1: bm25::K1,
            bm25_b: bm25::B,
        }
    }
}

pub fn search(index: &Index, raw_query: &str, top_n: usize, options: &SearchOptions) -> SearchResult {
    let started = Instant::now();
    let trimmed = raw_query.trim();
    if trimmed.is_empty() {
        return SearchResult::empty(raw_query);
    }

    let parsed = query::parse(trimmed);
    if parsed.is_empty() {
        return SearchResult::empty(raw_query);
    }

    let mut candidate_ids: HashSet<String> = HashSet::new();
    for term in parsed.all_terms() {
        candidate_ids.extend(index.get_postings(&term).into_keys());
    }
    // Order candidates by the index's own insertion order rather than the
    // hash order `candidate_ids` happened to produce, so that score ties
    // break deterministically below.
    let mut candidates: Vec<String> = index
        .get_all_document_ids()
        .into_iter()
        .filter(|id| candidate_ids.contains(id))
        .collect();

    if !parsed.required_terms.is_empty() {
        candidates.retain(|doc_id| {
            parsed
                .required_terms
                .iter()
                .all(|term| index.get_posting(term, doc_id).is_some())
        });
    }

    for phrase in &parsed.phrases {
        candidates.retain(|doc_id| phrase_matches(index, phrase, doc_id));
    }

    if let Some(content_type) = options.content_type {
        candidates.retain(|doc_id| {
            index
                .get_document(doc_id)
                .map(|meta| meta.content_type == content_type)
                .unwrap_or(false)
        });
    }

    let all_terms = parsed.all_terms();
    let mut scored: Vec<(String, f64)> = candidates
        .into_iter()
        .map(|doc_id| {
            let score = bm25::score(index, &all_terms, &doc_id, options.bm25_k1, options.bm25_b);
            (doc_id, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let total_matches = scored.len();
    let mut items = Vec::with_capacity(top_n.min(scored.len()));
    for (doc_id, score) in scored.into_iter().take(top_n) {
        let Some(meta) = index.get_document(&doc_id) else {
            continue;
        };
        let content = index.get_document_content(&doc_id).unwrap_or_default();
        let domain = meta.url.as_deref().and_then(host_of);
        let is_scholarly = domain.as_deref().map(scholarly::is_scholarly_domain).unwrap_or(false);
        items.push(SearchResultItem {
            title: meta.title,
            url: meta.url,
            snippet: snippet::generate(&content, &all_terms),
            score,
            source_type: SourceType::Indexed,
            is_scholarly,
            domain,
        });
    }

    SearchResult {
        query: raw_query.to_string(),
        total_matches,
        elapsed_milliseconds: started.elapsed().as_millis() as u64,
        items,
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
}

/// A document matches `[t1..tk]` iff some position `s` has `ti` at `s+i` for
/// every `i`. Uses the first term's positions as anchors.
fn phrase_matches(index: &Index, phrase: &[String], doc_id: &str) -> bool {
    let Some(first_term) = phrase.first() else {
        return true;
    };
    let Some(anchor_posting) = index.get_posting(first_term, doc_id) else {
        return false;
    };

    'anchor: for &start in &anchor_posting.positions {
        for (offset, term) in phrase.iter().enumerate().skip(1) {
            let Some(posting) = index.get_posting(term, doc_id) else {
                return false;
            };
            if !posting.positions.contains(&(start + offset as u32)) {
                continue 'anchor;
            }
        }
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use theoria_core::{ContentType, DocumentMeta};

    fn meta(id: &str, content_type: ContentType) -> DocumentMeta {
        DocumentMeta {
            id: id.to_string(),
            title: id.to_string(),
            url: Some(format!("https://{id}.test/")),
            source_path: None,
            content_type,
            last_indexed_at_epoch_s: 0,
        }
    }

    #[test]
    fn empty_query_returns_empty_result() {
        let index = Index::new();
        let result = search(&index, "   ", 10, &SearchOptions::default());
        assert_eq!(result.total_matches, 0);
    }

    #[test]
    fn phrase_query_matches_only_documents_with_the_contiguous_phrase() {
        let index = Index::new();
        index.add_document(meta("a", ContentType::Html), "natural law tradition");
        index.add_document(meta("b", ContentType::Html), "law of nature");
        let result = search(&index, "\"natural law\"", 10, &SearchOptions::default());
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].title, "a");
    }

    #[test]
    fn required_terms_use_and_semantics() {
        let index = Index::new();
        index.add_document(meta("a", ContentType::Html), "natural law");
        index.add_document(meta("b", ContentType::Html), "natural rights");
        let result = search(&index, "natural law", 10, &SearchOptions::default());
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].title, "a");
    }

    #[test]
    fn content_type_filter_excludes_non_matching_documents() {
        let index = Index::new();
        index.add_document(meta("a", ContentType::Html), "ethics of virtue");
        index.add_document(meta("b", ContentType::Pdf), "ethics of virtue");
        let options = SearchOptions { content_type: Some(ContentType::Pdf), ..SearchOptions::default() };
        let result = search(&index, "ethics", 10, &options);
        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].title, "b");
    }

    #[test]
    fn results_are_sorted_descending_by_score() {
        let index = Index::new();
        index.add_document(meta("a", ContentType::Html), "law law law law");
        index.add_document(meta("b", ContentType::Html), "law appears only once here");
        let result = search(&index, "law", 10, &SearchOptions::default());
        assert_eq!(result.items[0].title, "a");
    }

    #[test]
    fn tied_scores_break_in_insertion_order_every_run() {
        let index = Index::new();
        index.add_document(meta("c", ContentType::Html), "natural law");
        index.add_document(meta("a", ContentType::Html), "natural law");
        index.add_document(meta("b", ContentType::Html), "natural law");
        let result = search(&index, "natural law", 10, &SearchOptions::default());
        let titles: Vec<&str> = result.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "a", "b"]);
    }
}
