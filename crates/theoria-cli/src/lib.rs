//! `theoria-cli` crate (library surface).
//!
//! The primary entrypoint for end users is the `theoria` binary. This
//! library module exists to support embedding and to provide a stable way
//! to reuse CLI-adjacent helpers without depending on internal layout.

pub use theoria_core as core;
pub use theoria_engine as engine;
