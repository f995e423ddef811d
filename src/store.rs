//! Byte-budgeted fragment store.
//!
//! Stores rendered fragments keyed by `(component name, cache key)`.
//! `total_size` and `entry_count` are exact running tallies; eviction is
//! least-recently-accessed first, with an optional freshness exemption so
//! a cold-cache burst does not eject entries that were just touched.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::EngineConfig;

/// One cached fragment.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// Rendered (possibly templated) markup.
    pub html: String,
    /// Number of times this entry has been served.
    pub hits: u64,
    /// Last time this entry was read or written.
    pub last_access: Instant,
    /// `entry_key.len() + html.len()`, counted against the byte budget.
    pub size: usize,
}

/// In-memory fragment store with a byte budget.
#[derive(Debug)]
pub struct CacheStore {
    cache: HashMap<String, CacheEntry>,
    total_size: usize,
    entry_count: usize,
    max_size: usize,
    min_free: usize,
    max_free: usize,
    fresh_window: Duration,
}

fn entry_key(name: &str, key: &str) -> String {
    format!("{name}-{key}")
}

impl CacheStore {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            cache: HashMap::new(),
            total_size: 0,
            entry_count: 0,
            max_size: config.max_cache_size,
            min_free: config.min_free_cache_size,
            max_free: config.max_free_cache_size,
            fresh_window: Duration::from_millis(config.fresh_window_ms),
        }
    }

    /// Insert a fragment, evicting first if the budget would be exceeded.
    ///
    /// Re-inserting an existing `(name, key)` replaces the entry and
    /// adjusts the tallies exactly.
    pub fn new_entry(&mut self, name: &str, key: &str, html: String) {
        let entry_key = entry_key(name, key);
        let size = entry_key.len() + html.len();

        if let Some(old) = self.cache.remove(&entry_key) {
            self.total_size -= old.size;
            self.entry_count -= 1;
        }

        if self.total_size + size > self.max_size {
            self.clean_cache(self.min_free);
        }

        self.cache.insert(
            entry_key,
            CacheEntry {
                html,
                hits: 0,
                last_access: Instant::now(),
                size,
            },
        );
        self.total_size += size;
        self.entry_count += 1;
    }

    /// Look up a fragment. A hit bumps the hit counter and refreshes the
    /// access time; an absent key is a plain miss.
    pub fn get_entry(&mut self, name: &str, key: &str) -> Option<CacheEntry> {
        let entry = self.cache.get_mut(&entry_key(name, key))?;
        entry.hits += 1;
        entry.last_access = Instant::now();
        Some(entry.clone())
    }

    /// Drop a fragment outright (used when an entry is found inconsistent).
    pub fn remove_entry(&mut self, name: &str, key: &str) {
        if let Some(old) = self.cache.remove(&entry_key(name, key)) {
            self.total_size -= old.size;
            self.entry_count -= 1;
        }
    }

    /// Evict least-recently-accessed entries until at least `min_free`
    /// bytes are reclaimed, bounded by the max-free ceiling. Entries
    /// touched within the freshness window are exempt.
    pub fn clean_cache(&mut self, min_free: usize) {
        let decision_time = Instant::now();
        let mut candidates: Vec<(String, Instant, usize)> = self
            .cache
            .iter()
            .filter(|(_, entry)| {
                decision_time.duration_since(entry.last_access) >= self.fresh_window
            })
            .map(|(k, entry)| (k.clone(), entry.last_access, entry.size))
            .collect();
        candidates.sort_by_key(|(_, last_access, _)| *last_access);

        let mut freed = 0usize;
        let mut evicted = 0usize;
        for (key, _, size) in candidates {
            if freed >= min_free || freed >= self.max_free {
                break;
            }
            self.cache.remove(&key);
            self.total_size -= size;
            self.entry_count -= 1;
            freed += size;
            evicted += 1;
        }

        debug!(
            freed,
            evicted,
            total_size = self.total_size,
            entry_count = self.entry_count,
            "cache eviction pass"
        );
    }

    pub fn total_size(&self) -> usize {
        self.total_size
    }

    pub fn entry_count(&self) -> usize {
        self.entry_count
    }

    /// Snapshot of live entries, keyed by the composite entry key.
    pub fn entries(&self) -> Vec<(String, CacheEntry)> {
        self.cache
            .iter()
            .map(|(k, entry)| (k.clone(), entry.clone()))
            .collect()
    }

    /// Per-entry hit counts, keyed by the composite entry key.
    pub fn hit_report(&self) -> HashMap<String, u64> {
        self.cache
            .iter()
            .map(|(k, entry)| (k.clone(), entry.hits))
            .collect()
    }

    /// Exact recomputation of the byte tally, for accounting checks.
    #[cfg(test)]
    fn recount(&self) -> (usize, usize) {
        let size = self
            .cache
            .iter()
            .map(|(k, entry)| {
                debug_assert_eq!(entry.size, k.len() + entry.html.len());
                entry.size
            })
            .sum();
        (size, self.cache.len())
    }
}
