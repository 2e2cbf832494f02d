//! Theoria's retrieval engine: tokenizer and Porter stemmer (C1), inverted
//! index (C4), BM25 scorer (C5), best-window snippet generator (C6), query
//! parser (C7), HTML extractor (C2), discovery scraper (C3), indexed-search
//! engine (C8), response cache (C10), and the live-search orchestrator (C9)
//! that ties them together.

pub mod bm25;
pub mod cache;
pub mod config;
pub mod discovery;
pub mod fetch;
pub mod html;
pub mod index;
pub mod live;
pub mod porter;
pub mod query;
pub mod robots;
pub mod scholarly;
pub mod search_engine;
pub mod snippet;
pub mod tokenize;

pub use config::LiveSearchConfig;
pub use index::Index;
pub use live::LiveSearchEngine;
pub use tokenize::Tokenizer;
