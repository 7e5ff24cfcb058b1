//! Analytics result cache.
//!
//! Uses `moka::sync::Cache` holding the serialized JSON of each analytics
//! view. Keys are `analytics_{view}_{k1=v1&k2=v2}` with parameters sorted by
//! name; view names use `-`, never `_`. Tracks hits and misses. Any write
//! that touches analytics inputs drops every `analytics_` entry.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use moka::sync::Cache;
use serde::Serialize;

use crate::config::AppConfig;
use crate::error::ServiceResult;

pub const KEY_PREFIX: &str = "analytics_";

/// Build a cache key. Parameters with no value are left out.
pub fn cache_key(view: &str, params: &[(&str, Option<String>)]) -> String {
    let mut parts: Vec<(&str, &str)> = params
        .iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (*k, v)))
        .collect();
    parts.sort();
    let query = parts
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    format!("{KEY_PREFIX}{view}_{query}")
}

/// View name of a key: the segment between the prefix and the parameters.
fn view_of(key: &str) -> &str {
    let rest = key.strip_prefix(KEY_PREFIX).unwrap_or(key);
    rest.split('_').next().unwrap_or(rest)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_entries: u64,
    pub entries_by_view: BTreeMap<String, u64>,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

pub struct AnalyticsCache {
    cache: Cache<String, serde_json::Value>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl std::fmt::Debug for AnalyticsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsCache")
            .field("entries", &self.cache.entry_count())
            .finish()
    }
}

impl AnalyticsCache {
    pub fn new(ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();
        Self {
            cache,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.cache_ttl, config.cache_capacity)
    }

    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        match self.cache.get(key) {
            Some(v) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(v)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Cached value for `key`, or compute, store and return it. Errors are not cached.
    pub fn get_or_compute<T, F>(&self, key: String, compute: F) -> ServiceResult<serde_json::Value>
    where
        T: Serialize,
        F: FnOnce() -> ServiceResult<T>,
    {
        if let Some(hit) = self.get(&key) {
            tracing::debug!(%key, "analytics cache hit");
            return Ok(hit);
        }
        let value = serde_json::to_value(compute()?)?;
        self.cache.insert(key, value.clone());
        Ok(value)
    }

    fn keys_matching(&self, pattern: &str) -> Vec<String> {
        self.cache.run_pending_tasks();
        self.cache
            .iter()
            .filter(|(k, _)| k.contains(pattern))
            .map(|(k, _)| k.as_ref().clone())
            .collect()
    }

    /// Drop every entry whose key contains `pattern`; returns how many were dropped.
    pub fn clear(&self, pattern: &str) -> usize {
        let keys = self.keys_matching(pattern);
        for key in &keys {
            self.cache.invalidate(key);
        }
        self.cache.run_pending_tasks();
        keys.len()
    }

    /// Drop all analytics entries after a write.
    pub fn invalidate_analytics(&self) {
        let dropped = self.clear(KEY_PREFIX);
        if dropped > 0 {
            tracing::debug!(dropped, "analytics cache invalidated");
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.run_pending_tasks();
        let mut entries_by_view: BTreeMap<String, u64> = BTreeMap::new();
        for (key, _) in self.cache.iter() {
            *entries_by_view.entry(view_of(&key).to_string()).or_insert(0) += 1;
        }
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            total_entries: self.cache.entry_count(),
            entries_by_view,
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }
}
