//! Process-local read-through cache with per-entry TTL.
//!
//! Entries carry an absolute expiry computed from the injected [`Clock`] and
//! are evicted lazily: an expired entry is removed by the `get` that finds
//! it, or in bulk by [`TtlCache::cleanup_expired`].
//!
//! Two callers that miss at the same time both run their loader and the last
//! write wins. Only cache values that are idempotent recomputations of the
//! same read.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use time::OffsetDateTime;
use tumiki_core::{SharedClock, system_clock};

use crate::config::CacheConfig;

/// TTL presets, chosen by how volatile the cached data is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTtl {
    Short,
    Medium,
    Long,
    VeryLong,
}

/// Durations behind each [`CacheTtl`] preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPresets {
    pub short: Duration,
    pub medium: Duration,
    pub long: Duration,
    pub very_long: Duration,
}

impl Default for TtlPresets {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for TtlPresets {
    fn from(cfg: &CacheConfig) -> Self {
        Self {
            short: Duration::from_secs(cfg.short_ttl_secs),
            medium: Duration::from_secs(cfg.medium_ttl_secs),
            long: Duration::from_secs(cfg.long_ttl_secs),
            very_long: Duration::from_secs(cfg.very_long_ttl_secs),
        }
    }
}

impl TtlPresets {
    pub fn duration(&self, ttl: CacheTtl) -> Duration {
        match ttl {
            CacheTtl::Short => self.short,
            CacheTtl::Medium => self.medium,
            CacheTtl::Long => self.long,
            CacheTtl::VeryLong => self.very_long,
        }
    }
}

/// Colon-joined cache key, e.g. `cache_key("app-data", &["2025-10"]) == "app-data:2025-10"`.
pub fn cache_key<S: AsRef<str>>(prefix: &str, parts: &[S]) -> String {
    let mut key = String::from(prefix);
    for part in parts {
        key.push(':');
        key.push_str(part.as_ref());
    }
    key
}

struct CacheEntry<V> {
    value: V,
    expires_at: OffsetDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub hits: u64,
    pub misses: u64,
}

pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    presets: TtlPresets,
    clock: SharedClock,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("size", &self.entries.len())
            .field("presets", &self.presets)
            .finish_non_exhaustive()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new(TtlPresets::default())
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new(presets: TtlPresets) -> Self {
        Self {
            entries: DashMap::new(),
            presets,
            clock: system_clock(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn presets(&self) -> &TtlPresets {
        &self.presets
    }

    pub fn ttl(&self, preset: CacheTtl) -> Duration {
        self.presets.duration(preset)
    }

    /// Stores `value` until `now + ttl`, replacing any previous entry.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let expires_at = self.clock.now() + ttl;
        tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set");
        self.entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Returns the value if it has not expired; an expired entry is evicted.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();

        if let Some(entry) = self.entries.get(key) {
            if entry.expires_at > now {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
            drop(entry);
            self.entries.remove_if(key, |_, e| e.expires_at <= now);
            tracing::debug!(key, "cache entry expired");
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Removes one entry. Returns whether it was present.
    pub fn clear(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes every entry. Returns how many were dropped.
    pub fn clear_all(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        tracing::info!(count, "cache cleared");
        count
    }

    pub fn cleanup_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        before.saturating_sub(self.entries.len())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Read-through lookup: on a miss, awaits `load`, caches its value and
    /// returns it. Loader errors are returned as-is and nothing is cached.
    pub async fn get_or_load<F, Fut, E>(&self, key: &str, ttl: Duration, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key) {
            tracing::debug!(key, "cache hit");
            return Ok(hit);
        }
        let value = load().await?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }
}
