//! Per-component caching policy.
//!
//! Policies are owned by the host and handed to the engine wholesale via
//! [`CachingConfig`]; the engine only reads them. A component with no
//! policy entry is not cacheable.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer};

use crate::props::PropsValue;

/// Cache key strategy for one component.
///
/// Unrecognized strategy names deserialize into `Other` and are surfaced
/// as a fatal configuration error at the first render call that hits them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    /// Cache whole output under a key projected from the props.
    Simple,
    /// Cache the structural template; reinject leaf values per render.
    Template,
    /// Anything the config named that this engine does not implement.
    Other(String),
}

impl Default for Strategy {
    /// An unset strategy is a configuration error: it surfaces at the
    /// first render call instead of silently caching whole output.
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl<'de> Deserialize<'de> for Strategy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(match name.as_str() {
            "simple" => Self::Simple,
            "template" => Self::Template,
            _ => Self::Other(name),
        })
    }
}

/// Host-supplied cache key function for the simple strategy.
#[derive(Clone)]
pub struct CustomKeyFn(Arc<dyn Fn(&PropsValue) -> String + Send + Sync>);

impl CustomKeyFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&PropsValue) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn key_for(&self, props: &PropsValue) -> String {
        (self.0)(props)
    }
}

impl fmt::Debug for CustomKeyFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomKeyFn(..)")
    }
}

/// Caching policy for one component.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ComponentPolicy {
    /// Whether caching is enabled for this component.
    pub enable: bool,
    /// Key strategy.
    pub strategy: Strategy,
    /// Keys whose values the render branches on: copied verbatim into the
    /// template and inlined literally into the cache key.
    pub preserve_keys: HashSet<String>,
    /// String keys whose *emptiness* the render branches on: empty values
    /// are copied verbatim instead of templatized.
    pub preserve_empty_keys: HashSet<String>,
    /// Keys irrelevant to rendering: copied verbatim, no cache-key
    /// contribution at all.
    pub ignore_keys: HashSet<String>,
    /// Non-string scalar keys that only affect displayed text, never
    /// branching: opt-in to templatizing them like strings.
    pub whitelist_non_string_keys: HashSet<String>,
    /// Optional key function for the simple strategy; falls back to
    /// canonical props serialization.
    #[serde(skip)]
    pub custom_key_fn: Option<CustomKeyFn>,
}

/// Full registry payload, replaced wholesale via
/// [`CacheEngine::set_caching_config`](crate::engine::CacheEngine::set_caching_config).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CachingConfig {
    pub components: HashMap<String, ComponentPolicy>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_names_deserialize() {
        let config: CachingConfig = serde_json::from_str(
            r#"{
                "components": {
                    "Hello": {"strategy": "template", "enable": true},
                    "Footer": {"strategy": "simple", "enable": true},
                    "Weird": {"strategy": "lru2q", "enable": true}
                }
            }"#,
        )
        .expect("config should deserialize");

        assert_eq!(config.components["Hello"].strategy, Strategy::Template);
        assert_eq!(config.components["Footer"].strategy, Strategy::Simple);
        assert_eq!(
            config.components["Weird"].strategy,
            Strategy::Other("lru2q".to_string())
        );
    }

    #[test]
    fn missing_strategy_is_unknown() {
        let config: CachingConfig = serde_json::from_str(
            r#"{"components": {"Hello": {"enable": true}}}"#,
        )
        .expect("config should deserialize");
        assert_eq!(
            config.components["Hello"].strategy,
            Strategy::Other(String::new())
        );
    }

    #[test]
    fn key_sets_default_empty() {
        let config: CachingConfig = serde_json::from_str(
            r#"{"components": {"Hello": {"strategy": "template", "enable": true}}}"#,
        )
        .expect("config should deserialize");
        let policy = &config.components["Hello"];
        assert!(policy.preserve_keys.is_empty());
        assert!(policy.preserve_empty_keys.is_empty());
        assert!(policy.ignore_keys.is_empty());
        assert!(policy.whitelist_non_string_keys.is_empty());
        assert!(policy.custom_key_fn.is_none());
    }

    #[test]
    fn custom_key_fn_projects_props() {
        let f = CustomKeyFn::new(|_| "k".to_string());
        assert_eq!(f.key_for(&PropsValue::Null), "k");
    }
}
