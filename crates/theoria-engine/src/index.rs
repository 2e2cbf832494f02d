//! C4: thread-safe inverted index with a forward index for O(terms-in-doc) removal.

use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap, HashSet};
use theoria_core::{DocumentMeta, Posting};

use crate::tokenize;

#[derive(Default)]
struct IndexState {
    postings: HashMap<String, HashMap<String, Posting>>,
    documents: HashMap<String, DocumentMeta>,
    doc_lengths: HashMap<String, u32>,
    doc_contents: HashMap<String, String>,
    doc_terms: HashMap<String, HashSet<String>>,
    /// Insertion order of document ids, independent of `documents`'
    /// hash order, so ranking ties break deterministically.
    doc_order: Vec<String>,
    avg_doc_length: Option<f64>,
}

impl IndexState {
    fn remove_document_locked(&mut self, doc_id: &str) {
        if let Some(terms) = self.doc_terms.remove(doc_id) {
            for term in terms {
                if let Some(postings_for_term) = self.postings.get_mut(&term) {
                    postings_for_term.remove(doc_id);
                    if postings_for_term.is_empty() {
                        self.postings.remove(&term);
                    }
                }
            }
        }
        if self.documents.remove(doc_id).is_some() {
            self.doc_order.retain(|id| id != doc_id);
        }
        self.doc_lengths.remove(doc_id);
        self.doc_contents.remove(doc_id);
    }
}

/// Thread-safe inverted index: lock-free reads of a consistent snapshot per
/// sub-structure, single write lock serializing all mutation.
pub struct Index {
    state: RwLock<IndexState>,
}

impl Default for Index {
    fn default() -> Self {
        Self::new()
    }
}

impl Index {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
        }
    }

    /// Tokenize `content`, replacing any existing postings/metadata for
    /// `meta.id` atomically under the write lock.
    pub fn add_document(&self, meta: DocumentMeta, content: &str) {
        let terms = tokenize::tokenize(content);
        let doc_id = meta.id.clone();

        let mut positions: HashMap<String, BTreeSet<u32>> = HashMap::new();
        for (pos, term) in terms.iter().enumerate() {
            positions.entry(term.clone()).or_default().insert(pos as u32);
        }

        let mut state = self.state.write();
        state.remove_document_locked(&doc_id);

        for (term, term_positions) in positions {
            let posting = Posting {
                doc_id: doc_id.clone(),
                term_frequency: term_positions.len() as u32,
                positions: term_positions,
            };
            state
                .postings
                .entry(term.clone())
                .or_default()
                .insert(doc_id.clone(), posting);
        }

        state
            .doc_terms
            .insert(doc_id.clone(), terms.iter().cloned().collect());
        state.doc_lengths.insert(doc_id.clone(), terms.len() as u32);
        state.doc_contents.insert(doc_id.clone(), content.to_string());
        state.doc_order.push(doc_id.clone());
        state.documents.insert(doc_id, meta);
        state.avg_doc_length = None;
    }

    pub fn remove_document(&self, doc_id: &str) {
        let mut state = self.state.write();
        state.remove_document_locked(doc_id);
        state.avg_doc_length = None;
    }

    pub fn clear(&self) {
        let mut state = self.state.write();
        *state = IndexState::default();
    }

    pub fn get_postings(&self, term: &str) -> HashMap<String, Posting> {
        self.state
            .read()
            .postings
            .get(term)
            .cloned()
            .unwrap_or_default()
    }

    pub fn get_document_frequency(&self, term: &str) -> usize {
        self.state
            .read()
            .postings
            .get(term)
            .map(|m| m.len())
            .unwrap_or(0)
    }

    pub fn get_posting(&self, term: &str, doc_id: &str) -> Option<Posting> {
        self.state.read().postings.get(term)?.get(doc_id).cloned()
    }

    pub fn get_document(&self, doc_id: &str) -> Option<DocumentMeta> {
        self.state.read().documents.get(doc_id).cloned()
    }

    pub fn get_document_length(&self, doc_id: &str) -> u32 {
        self.state
            .read()
            .doc_lengths
            .get(doc_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn get_document_content(&self, doc_id: &str) -> Option<String> {
        self.state.read().doc_contents.get(doc_id).cloned()
    }

    pub fn get_all_document_ids(&self) -> Vec<String> {
        self.state.read().doc_order.clone()
    }

    pub fn document_count(&self) -> usize {
        self.state.read().documents.len()
    }

    /// O(1) amortized: recomputed lazily the first time it's read after a
    /// mutation invalidates the cache.
    pub fn average_document_length(&self) -> f64 {
        {
            let state = self.state.read();
            if let Some(avg) = state.avg_doc_length {
                return avg;
            }
        }
        let mut state = self.state.write();
        if let Some(avg) = state.avg_doc_length {
            return avg;
        }
        let avg = if state.doc_lengths.is_empty() {
            0.0
        } else {
            let total: u64 = state.doc_lengths.values().map(|&l| l as u64).sum();
            total as f64 / state.doc_lengths.len() as f64
        };
        state.avg_doc_length = Some(avg);
        avg
    }
}
