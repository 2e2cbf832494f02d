//! C5: Okapi BM25 over the inverted index, O(1) per-(term, doc) access.

use crate::index::Index;

pub const K1: f64 = 1.2;
pub const B: f64 = 0.75;

/// Score `doc_id` against `query_terms` (duplicates retained; repeated terms
/// accumulate their IDF-weighted contribution once per occurrence, matching
/// a document scored against `required ∪ optional ∪ flatten(phrases)`).
/// `k1`/`b` are the Okapi free parameters; callers pass the crate defaults
/// (`K1`/`B`) or a runtime-configured pair.
pub fn score(index: &Index, query_terms: &[String], doc_id: &str, k1: f64, b: f64) -> f64 {
    let total_docs = index.document_count();
    let avg_doc_length = index.average_document_length();
    if total_docs == 0 || avg_doc_length == 0.0 {
        return 0.0;
    }

    let doc_length = index.get_document_length(doc_id) as f64;
    let n = total_docs as f64;

    let mut total = 0.0;
    for term in query_terms {
        let doc_freq = index.get_document_frequency(term);
        if doc_freq == 0 {
            continue;
        }
        let df = doc_freq as f64;
        let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln();

        let tf = index
            .get_posting(term, doc_id)
            .map(|p| p.term_frequency as f64)
            .unwrap_or(0.0);
        if tf == 0.0 {
            continue;
        }

        let tf_norm = tf * (k1 + 1.0) / (tf + k1 * (1.0 - b + b * doc_length / avg_doc_length));
        total += idf * tf_norm;
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use theoria_core::{ContentType, DocumentMeta};

    fn meta(id: &str) -> DocumentMeta {
        DocumentMeta {
            id: id.to_string(),
            title: id.to_string(),
            url: None,
            source_path: None,
            content_type: ContentType::Html,
            last_indexed_at_epoch_s: 0,
        }
    }

    #[test]
    fn empty_index_scores_zero() {
        let index = Index::new();
        assert_eq!(score(&index, &["law".to_string()], "a", K1, B), 0.0);
    }

    #[test]
    fn term_absent_from_document_contributes_nothing() {
        let index = Index::new();
        index.add_document(meta("a"), "natural law tradition");
        index.add_document(meta("b"), "civil procedure code");
        assert_eq!(score(&index, &["procedur".to_string()], "a", K1, B), 0.0);
    }

    #[test]
    fn higher_term_frequency_scores_higher() {
        let index = Index::new();
        index.add_document(meta("a"), "law law law law law");
        index.add_document(meta("b"), "law governs this short passage about justice");
        let terms = vec!["law".to_string()];
        assert!(score(&index, &terms, "a", K1, B) > 0.0);
    }

    #[test]
    fn non_negative_when_every_term_is_rare() {
        let index = Index::new();
        index.add_document(meta("a"), "alpha beta gamma");
        index.add_document(meta("b"), "delta epsilon zeta");
        index.add_document(meta("c"), "eta theta iota");
        let terms = vec!["alpha".to_string(), "beta".to_string()];
        assert!(score(&index, &terms, "a", K1, B) >= 0.0);
    }

    #[test]
    fn a_higher_k1_amplifies_the_term_frequency_contribution() {
        let index = Index::new();
        index.add_document(meta("a"), "law law law governs this tradition");
        index.add_document(meta("b"), "a short passage about justice");
        let terms = vec!["law".to_string()];
        let low_k1 = score(&index, &terms, "a", 0.5, B);
        let high_k1 = score(&index, &terms, "a", 3.0, B);
        assert!(high_k1 > low_k1);
    }
}
