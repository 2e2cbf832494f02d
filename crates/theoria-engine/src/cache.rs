//! C10: bounded-TTL in-memory response cache keyed by (mode, topN, normalized query).

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use theoria_core::SearchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Live,
    Indexed,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    mode: Mode,
    top_n: usize,
    normalized_query: String,
}

impl CacheKey {
    pub fn new(mode: Mode, top_n: usize, query: &str) -> Self {
        Self {
            mode,
            top_n,
            normalized_query: query.trim().to_lowercase(),
        }
    }
}

struct Entry {
    result: SearchResult,
    inserted_at: Instant,
}

/// Thread-safe; entries older than `ttl` are treated as absent on read and
/// evicted lazily.
pub struct ResponseCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, Entry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<SearchResult> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.inserted_at.elapsed() > self.ttl {
            return None;
        }
        Some(entry.result.clone())
    }

    pub fn put(&self, key: CacheKey, result: SearchResult) {
        self.entries.write().insert(
            key,
            Entry {
                result,
                inserted_at: Instant::now(),
            },
        );
    }
}
