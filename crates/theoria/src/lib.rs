//! Public facade crate for `theoria`.
//!
//! This crate intentionally contains no IO logic of its own. It re-exports
//! the backend-agnostic types from `theoria-core` and the concrete retrieval
//! engine (tokenizer, index, scorer, snippet generator, live-search
//! orchestrator) from `theoria-engine`.

pub use theoria_core::*;
pub use theoria_engine as engine;
