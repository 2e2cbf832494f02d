//! A3: env-var-driven runtime configuration. Construction never touches disk.

use std::time::Duration;

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_f64(name: &str, default: f64) -> f64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone, PartialEq)]
pub struct LiveSearchConfig {
    pub max_discovery_results: usize,
    pub max_parallel_fetches: usize,
    pub per_page_timeout_seconds: u64,
    pub discovery_timeout_seconds: u64,
    pub cache_ttl_seconds: u64,
    pub bm25_k1: f64,
    pub bm25_b: f64,
}

impl Default for LiveSearchConfig {
    fn default() -> Self {
        Self {
            max_discovery_results: 50,
            max_parallel_fetches: 8,
            per_page_timeout_seconds: 10,
            discovery_timeout_seconds: 15,
            cache_ttl_seconds: 300,
            bm25_k1: 1.2,
            bm25_b: 0.75,
        }
    }
}

impl LiveSearchConfig {
    /// Reads `THEORIA_*` overrides; missing or unparsable values silently
    /// fall back to the default. Never panics on malformed env.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_discovery_results: env_u64(
                "THEORIA_MAX_DISCOVERY_RESULTS",
                default.max_discovery_results as u64,
            ) as usize,
            max_parallel_fetches: env_u64(
                "THEORIA_MAX_PARALLEL_FETCHES",
                default.max_parallel_fetches as u64,
            ) as usize,
            per_page_timeout_seconds: env_u64(
                "THEORIA_PER_PAGE_TIMEOUT_SECONDS",
                default.per_page_timeout_seconds,
            ),
            discovery_timeout_seconds: env_u64(
                "THEORIA_DISCOVERY_TIMEOUT_SECONDS",
                default.discovery_timeout_seconds,
            ),
            cache_ttl_seconds: env_u64("THEORIA_CACHE_TTL_SECONDS", default.cache_ttl_seconds),
            bm25_k1: env_f64("THEORIA_BM25_K1", default.bm25_k1),
            bm25_b: env_f64("THEORIA_BM25_B", default.bm25_b),
        }
    }

    pub fn per_page_timeout(&self) -> Duration {
        Duration::from_secs(self.per_page_timeout_seconds)
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.discovery_timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}
