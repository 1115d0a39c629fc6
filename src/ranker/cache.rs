//! Memoization for the semantic ranker.
//!
//! Both caches are pure memoizations of deterministic functions, so sharing
//! them across ranking calls never changes a result.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use regex::Regex;

use crate::error::{CellmapError, CellmapResult};

fn lock_err(context: &'static str) -> CellmapError {
    CellmapError::internal(format!("poisoned lock: {context}"))
}

fn whitespace_run() -> &'static Regex {
    static WS: OnceLock<Regex> = OnceLock::new();
    WS.get_or_init(|| Regex::new(r"\s+").expect("static regex is valid"))
}

/// Trims, case-folds, and collapses internal whitespace runs to one space.
#[must_use]
pub fn normalize(raw: &str) -> String {
    whitespace_run()
        .replace_all(raw.trim(), " ")
        .to_lowercase()
}

/// Hit/miss counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups served from the cache.
    pub hits: u64,
    /// Lookups that had to compute the value.
    pub misses: u64,
    /// Distinct keys currently held.
    pub entries: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
}

/// Raw string -> normalized string.
#[derive(Debug, Default)]
pub struct NormalizationCache {
    map: RwLock<HashMap<String, Arc<str>>>,
    counters: RwLock<Counters>,
}

impl NormalizationCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalized form of `raw`, computed at most once per distinct input.
    ///
    /// # Errors
    ///
    /// Returns [`CellmapError::Internal`] if a cache lock was poisoned.
    pub fn get(&self, raw: &str) -> CellmapResult<Arc<str>> {
        {
            let map = self.map.read().map_err(|_| lock_err("normalize.read"))?;
            if let Some(hit) = map.get(raw) {
                self.counters.write().map_err(|_| lock_err("normalize.stats"))?.hits += 1;
                return Ok(Arc::clone(hit));
            }
        }

        let value: Arc<str> = Arc::from(normalize(raw));
        let mut map = self.map.write().map_err(|_| lock_err("normalize.write"))?;
        let entry = map.entry(raw.to_string()).or_insert(value);
        self.counters.write().map_err(|_| lock_err("normalize.stats"))?.misses += 1;
        Ok(Arc::clone(entry))
    }

    /// Current counters.
    ///
    /// # Errors
    ///
    /// Returns [`CellmapError::Internal`] if a cache lock was poisoned.
    pub fn stats(&self) -> CellmapResult<CacheStats> {
        let entries = self.map.read().map_err(|_| lock_err("normalize.stats"))?.len();
        let c = self.counters.read().map_err(|_| lock_err("normalize.stats"))?;
        Ok(CacheStats {
            hits: c.hits,
            misses: c.misses,
            entries,
        })
    }
}

/// Normalized string -> embedding vector.
#[derive(Debug, Default)]
pub struct EmbeddingCache {
    map: RwLock<HashMap<Arc<str>, Arc<[f32]>>>,
    counters: RwLock<Counters>,
}

impl EmbeddingCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached embedding for `key`, computing it with `embed` on a miss.
    ///
    /// # Errors
    ///
    /// Propagates errors from `embed` and returns [`CellmapError::Internal`]
    /// if a cache lock was poisoned.
    pub fn get_or_try_insert<F>(&self, key: &Arc<str>, embed: F) -> CellmapResult<Arc<[f32]>>
    where
        F: FnOnce(&str) -> CellmapResult<Vec<f32>>,
    {
        {
            let map = self.map.read().map_err(|_| lock_err("embedding.read"))?;
            if let Some(hit) = map.get(key) {
                self.counters.write().map_err(|_| lock_err("embedding.stats"))?.hits += 1;
                return Ok(Arc::clone(hit));
            }
        }

        let value: Arc<[f32]> = Arc::from(embed(&**key)?);
        let mut map = self.map.write().map_err(|_| lock_err("embedding.write"))?;
        let entry = map.entry(Arc::clone(key)).or_insert(value);
        self.counters.write().map_err(|_| lock_err("embedding.stats"))?.misses += 1;
        Ok(Arc::clone(entry))
    }

    /// Current counters.
    ///
    /// # Errors
    ///
    /// Returns [`CellmapError::Internal`] if a cache lock was poisoned.
    pub fn stats(&self) -> CellmapResult<CacheStats> {
        let entries = self.map.read().map_err(|_| lock_err("embedding.stats"))?.len();
        let c = self.counters.read().map_err(|_| lock_err("embedding.stats"))?;
        Ok(CacheStats {
            hits: c.hits,
            misses: c.misses,
            entries,
        })
    }
}
