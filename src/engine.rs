//! Render-cache engine.
//!
//! Owns the fragment store, policy registry, blacklist and key hasher as
//! one injectable object with an explicit lifecycle — hosts construct one
//! per process (or per test) instead of sharing ambient singletons.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, RwLock};

use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::error::CacheError;
use crate::hash::{CustomHashFn, KeyHasher};
use crate::lock::{mutex_lock, rw_read, rw_write};
use crate::policy::{CachingConfig, ComponentPolicy, Strategy};
use crate::props::{PropsValue, canonical_json};
use crate::renderer::{RenderContext, Renderer, SENTINEL_ID_START};
use crate::resolve;
use crate::store::CacheStore;
use crate::template;

const SOURCE: &str = "engine";

/// How the engine classified one render call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDecision {
    /// Not cacheable (no policy, disabled, blacklisted, or unsuitable props).
    None,
    /// Cacheable; this call missed and populated the store.
    Cache,
    /// An ancestor render is already being served from a template; nested
    /// caching is suppressed.
    ByParent,
    /// Served from the store.
    Hit,
}

impl fmt::Display for CacheDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::None => "NONE",
            Self::Cache => "cache",
            Self::ByParent => "byParent",
            Self::Hit => "HIT",
        })
    }
}

/// Templated render-cache engine.
pub struct CacheEngine {
    config: RwLock<EngineConfig>,
    store: Mutex<CacheStore>,
    components: RwLock<HashMap<String, ComponentPolicy>>,
    blacklist: RwLock<HashSet<String>>,
    hasher: RwLock<KeyHasher>,
}

impl CacheEngine {
    pub fn new(mut config: EngineConfig) -> Self {
        let hasher = if config.hash_keys {
            KeyHasher::builtin_or_identity()
        } else {
            KeyHasher::Identity
        };
        // Reflect a hasher fallback in the visible config.
        config.hash_keys = !hasher.is_identity();
        Self {
            store: Mutex::new(CacheStore::new(&config)),
            config: RwLock::new(config),
            components: RwLock::new(HashMap::new()),
            blacklist: RwLock::new(HashSet::new()),
            hasher: RwLock::new(hasher),
        }
    }

    /// Render `name` with `props`, serving from or populating the cache
    /// according to the component's policy.
    ///
    /// The only caller-visible failure is an enabled component configured
    /// with an unknown strategy.
    pub fn render_cached(
        &self,
        name: &str,
        props: &PropsValue,
        renderer: &dyn Renderer,
        ctx: &mut RenderContext,
    ) -> Result<String, CacheError> {
        let cfg = rw_read(&self.config, SOURCE, "render_cached.config").clone();
        let policy = rw_read(&self.components, SOURCE, "render_cached.policy")
            .get(name)
            .cloned();

        let props_cacheable = ctx.caching_owner.is_none()
            && !props.is_empty_props()
            && !props.has_structured_children()
            && !self.is_blacklisted(name);

        match policy {
            Some(policy) if cfg.caching && policy.enable && props_cacheable => {
                match policy.strategy {
                    Strategy::Simple => {
                        Ok(self.render_simple(&cfg, name, &policy, props, renderer, ctx))
                    }
                    Strategy::Template => {
                        Ok(self.render_template(&cfg, name, &policy, props, renderer, ctx))
                    }
                    Strategy::Other(ref strategy) => Err(CacheError::UnknownStrategy {
                        component: name.to_string(),
                        strategy: strategy.clone(),
                    }),
                }
            }
            _ => {
                let decision = if ctx.caching_owner.is_some() {
                    CacheDecision::ByParent
                } else {
                    CacheDecision::None
                };
                let rendered = renderer.render(name, props, ctx);
                Ok(self.wrap_debug(&cfg, name, decision, None, rendered))
            }
        }
    }

    /// Simple strategy: whole-output caching keyed by a props projection.
    fn render_simple(
        &self,
        cfg: &EngineConfig,
        name: &str,
        policy: &ComponentPolicy,
        props: &PropsValue,
        renderer: &dyn Renderer,
        ctx: &mut RenderContext,
    ) -> String {
        let cache_key = match &policy.custom_key_fn {
            Some(f) => f.key_for(props),
            None => canonical_json(props),
        };
        let key = rw_read(&self.hasher, SOURCE, "render_simple.hash").hash(&cache_key);

        if let Some(entry) =
            mutex_lock(&self.store, SOURCE, "render_simple.get").get_entry(name, &key)
        {
            debug!(component = name, key = %key, hits = entry.hits, "simple cache hit");
            let html = if ctx.static_markup {
                entry.html
            } else {
                resolve::renumber_ids(&entry.html, &mut ctx.id_counter)
            };
            return self.wrap_debug(cfg, name, CacheDecision::Hit, Some(&key), html);
        }

        let rendered = self.render_for_store(name, props, renderer, ctx);
        mutex_lock(&self.store, SOURCE, "render_simple.put").new_entry(
            name,
            &key,
            rendered.clone(),
        );
        let html = if ctx.static_markup {
            rendered
        } else {
            resolve::renumber_ids(&rendered, &mut ctx.id_counter)
        };
        self.wrap_debug(cfg, name, CacheDecision::Cache, Some(&key), html)
    }

    /// Template strategy: structural caching with per-render reinjection.
    fn render_template(
        &self,
        cfg: &EngineConfig,
        name: &str,
        policy: &ComponentPolicy,
        props: &PropsValue,
        renderer: &dyn Renderer,
        ctx: &mut RenderContext,
    ) -> String {
        let generated = template::generate(props, policy, cfg.strip_url_protocol);
        let key = rw_read(&self.hasher, SOURCE, "render_template.hash").hash(&generated.cache_key);

        if let Some(entry) =
            mutex_lock(&self.store, SOURCE, "render_template.get").get_entry(name, &key)
        {
            debug!(component = name, key = %key, hits = entry.hits, "template cache hit");
            let restored = resolve::restore_values(&entry.html, &generated.lookup, props);
            let html = if ctx.static_markup {
                restored
            } else {
                resolve::renumber_ids(&restored, &mut ctx.id_counter)
            };
            return self.wrap_debug(cfg, name, CacheDecision::Hit, Some(&key), html);
        }

        let saved_counter = ctx.id_counter;
        let templated = self.render_for_store(name, &generated.template, renderer, ctx);
        mutex_lock(&self.store, SOURCE, "render_template.put").new_entry(
            name,
            &key,
            templated.clone(),
        );

        let restored = resolve::restore_values(&templated, &generated.lookup, props);
        let html = if ctx.static_markup {
            restored
        } else {
            resolve::renumber_ids(&restored, &mut ctx.id_counter)
        };

        if cfg.verify_renders {
            // Safety net for components whose output depends on inputs the
            // traversal cannot see (ambient state read during render).
            let mut verify_ctx = RenderContext {
                id_counter: saved_counter,
                caching_owner: Some(name.to_string()),
                static_markup: ctx.static_markup,
            };
            let fresh = renderer.render(name, props, &mut verify_ctx);
            if fresh != html {
                warn!(
                    component = name,
                    key = %key,
                    "stored template does not reproduce a fresh render, blacklisting component"
                );
                rw_write(&self.blacklist, SOURCE, "render_template.blacklist")
                    .insert(name.to_string());
                mutex_lock(&self.store, SOURCE, "render_template.evict")
                    .remove_entry(name, &key);
                ctx.id_counter = verify_ctx.id_counter;
                // The returned render is uncached; the debug wrap carries no key.
                return self.wrap_debug(cfg, name, CacheDecision::None, None, fresh);
            }
        }

        self.wrap_debug(cfg, name, CacheDecision::Cache, Some(&key), html)
    }

    /// Miss-path render: sentinel identifier namespace and nested-caching
    /// suppression for the duration of the call, restored afterwards.
    fn render_for_store(
        &self,
        name: &str,
        props: &PropsValue,
        renderer: &dyn Renderer,
        ctx: &mut RenderContext,
    ) -> String {
        let saved_counter = ctx.id_counter;
        ctx.id_counter = SENTINEL_ID_START;
        ctx.caching_owner = Some(name.to_string());
        let rendered = renderer.render(name, props, ctx);
        ctx.id_counter = saved_counter;
        ctx.caching_owner = None;
        rendered
    }

    fn wrap_debug(
        &self,
        cfg: &EngineConfig,
        name: &str,
        decision: CacheDecision,
        key: Option<&str>,
        html: String,
    ) -> String {
        if cfg.caching && cfg.debug {
            let key = key.unwrap_or("-");
            format!("<!-- component {name} cacheType {decision} {key} -->{html}")
        } else {
            html
        }
    }

    // ========================================================================
    // Administrative surface
    // ========================================================================

    pub fn enable_caching(&self, flag: bool) {
        rw_write(&self.config, SOURCE, "enable_caching").caching = flag;
    }

    pub fn enable_debug(&self, flag: bool) {
        rw_write(&self.config, SOURCE, "enable_debug").debug = flag;
    }

    pub fn set_strip_url_protocol(&self, flag: bool) {
        rw_write(&self.config, SOURCE, "set_strip_url_protocol").strip_url_protocol = flag;
    }

    pub fn set_verify_renders(&self, flag: bool) {
        rw_write(&self.config, SOURCE, "set_verify_renders").verify_renders = flag;
    }

    /// Enable or disable key hashing. With hashing on and no custom
    /// function, the built-in hasher is used; if it is unavailable the
    /// engine falls back to identity keys.
    pub fn set_hash_keys(&self, flag: bool, custom: Option<CustomHashFn>) {
        let hasher = if !flag {
            KeyHasher::Identity
        } else if let Some(f) = custom {
            KeyHasher::Custom(f)
        } else {
            KeyHasher::builtin_or_identity()
        };
        rw_write(&self.config, SOURCE, "set_hash_keys").hash_keys = !hasher.is_identity();
        *rw_write(&self.hasher, SOURCE, "set_hash_keys.hasher") = hasher;
    }

    /// Replace the component policy registry wholesale.
    pub fn set_caching_config(&self, config: CachingConfig) {
        *rw_write(&self.components, SOURCE, "set_caching_config") = config.components;
    }

    /// Drop every cached fragment, keeping configuration and blacklist.
    pub fn clear_cache(&self) {
        let cfg = rw_read(&self.config, SOURCE, "clear_cache.config").clone();
        *mutex_lock(&self.store, SOURCE, "clear_cache") = CacheStore::new(&cfg);
    }

    pub fn clear_blacklist(&self) {
        rw_write(&self.blacklist, SOURCE, "clear_blacklist").clear();
    }

    pub fn is_blacklisted(&self, name: &str) -> bool {
        rw_read(&self.blacklist, SOURCE, "is_blacklisted").contains(name)
    }

    pub fn cache_size(&self) -> usize {
        mutex_lock(&self.store, SOURCE, "cache_size").total_size()
    }

    pub fn cache_entry_count(&self) -> usize {
        mutex_lock(&self.store, SOURCE, "cache_entry_count").entry_count()
    }

    /// Per-entry hit counts keyed by `name-key`.
    pub fn cache_hit_report(&self) -> HashMap<String, u64> {
        mutex_lock(&self.store, SOURCE, "cache_hit_report").hit_report()
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> EngineConfig {
        rw_read(&self.config, SOURCE, "config").clone()
    }
}
