//! Engine configuration.
//!
//! Controls caching behavior, key hashing, URL-protocol normalization and
//! the byte budget of the fragment store.

use serde::Deserialize;

// Default values for engine configuration
const DEFAULT_MAX_CACHE_SIZE: usize = 50 * 1024 * 1024; // 50 MiB
const DEFAULT_MIN_FREE_CACHE_SIZE: usize = 1024 * 1024;
const DEFAULT_MAX_FREE_CACHE_SIZE: usize = 10 * 1024 * 1024;
const DEFAULT_FRESH_WINDOW_MS: u64 = 0;

/// Engine configuration.
///
/// Deserializable so hosts can load it from their own config files; every
/// field has a default, so `EngineConfig::default()` is a working setup
/// (with caching itself still off until enabled).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Master switch for caching. Off by default.
    pub caching: bool,
    /// Wrap returned markup in an inline comment describing the cache decision.
    pub debug: bool,
    /// Compact cache keys through the key hasher.
    pub hash_keys: bool,
    /// Split `http://` / `https://` prefixes out of templatized strings so
    /// protocol variants of the same content share a cache entry.
    pub strip_url_protocol: bool,
    /// Verify template-strategy renders against an uncached render and
    /// blacklist the component on mismatch.
    pub verify_renders: bool,
    /// Total byte budget for the fragment store.
    pub max_cache_size: usize,
    /// Minimum bytes an eviction pass must reclaim.
    pub min_free_cache_size: usize,
    /// Ceiling on bytes reclaimed in a single eviction pass.
    pub max_free_cache_size: usize,
    /// Entries touched within this window are exempt from eviction.
    /// Zero disables the exemption.
    pub fresh_window_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            caching: false,
            debug: false,
            hash_keys: true,
            strip_url_protocol: true,
            verify_renders: true,
            max_cache_size: DEFAULT_MAX_CACHE_SIZE,
            min_free_cache_size: DEFAULT_MIN_FREE_CACHE_SIZE,
            max_free_cache_size: DEFAULT_MAX_FREE_CACHE_SIZE,
            fresh_window_ms: DEFAULT_FRESH_WINDOW_MS,
        }
    }
}
