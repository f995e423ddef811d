//! Template and cache-key generation.
//!
//! A single depth-first traversal of the props tree produces three things
//! at once: a template tree (placeholders substituted for cacheable
//! leaves), a lookup from placeholder token to props path, and a
//! structural cache key.
//!
//! Templatizing non-string props is opt-in only: a render can branch on a
//! boolean or a number (and on some strings — a status like `"PUBLISHED"`
//! vs `"UNPUBLISHED"` — which is what `preserve_keys` is for), so scalar
//! values are inlined into the cache key unless explicitly whitelisted.

use std::collections::HashMap;

use crate::policy::ComponentPolicy;
use crate::props::{PathSegment, PropsMap, PropsPath, PropsValue, canonical_json};
use crate::token;

/// Where one placeholder points back into the real props.
#[derive(Debug, Clone)]
pub struct LookupEntry {
    /// Path to the templatized leaf.
    pub path: PropsPath,
    /// Whether a URL-protocol prefix was split into the template at
    /// generation time. Resolution applies the inverse transform.
    pub url_split: bool,
}

/// Placeholder token → props path, valid for one render only.
pub type Lookup = HashMap<String, LookupEntry>;

/// Output of one template generation pass.
#[derive(Debug, Clone)]
pub struct Generated {
    /// Props-shaped tree with cacheable leaves replaced by placeholders.
    pub template: PropsValue,
    pub lookup: Lookup,
    /// Structural signature: key names, type/shape markers, inlined
    /// literals and placeholder back-references. Never raw templatized
    /// string content.
    pub cache_key: String,
}

/// Generate `{template, lookup, cache_key}` from a props tree.
///
/// Pure over a conforming tree; traversal order is the deterministic
/// enumeration order of [`PropsMap`] keys and array positions.
pub fn generate(
    props: &PropsValue,
    policy: &ComponentPolicy,
    strip_url_protocol: bool,
) -> Generated {
    let mut walker = Walker {
        policy,
        strip_url_protocol,
        lookup: Lookup::new(),
        path: PropsPath::new(),
        key_parts: Vec::new(),
        next_index: 0,
    };

    let template = match props {
        PropsValue::Object(map) => PropsValue::Object(walker.walk_object(map)),
        // Non-object roots carry no keyed structure to templatize.
        other => {
            walker.key_parts.push(canonical_json(other));
            other.clone()
        }
    };

    Generated {
        template,
        lookup: walker.lookup,
        cache_key: walker.key_parts.join(","),
    }
}

struct Walker<'a> {
    policy: &'a ComponentPolicy,
    strip_url_protocol: bool,
    lookup: Lookup,
    path: PropsPath,
    key_parts: Vec<String>,
    next_index: usize,
}

impl Walker<'_> {
    fn walk_object(&mut self, map: &PropsMap) -> PropsMap {
        let mut template = PropsMap::new();
        for (key, value) in map {
            if self.policy.ignore_keys.contains(key) {
                // Pure metadata: no cache-key contribution at all.
                template.insert(key.clone(), value.clone());
                continue;
            }

            self.key_parts.push(key.clone());

            if self.policy.preserve_keys.contains(key) {
                self.key_parts.push(canonical_json(value));
                template.insert(key.clone(), value.clone());
                continue;
            }

            let templated = self.walk_value(Some(key), value);
            template.insert(key.clone(), templated);
        }
        template
    }

    /// Dispatch on node kind. `key` is the owning object key, `None` for
    /// array elements (key-based policy rules apply to object keys only).
    fn walk_value(&mut self, key: Option<&str>, value: &PropsValue) -> PropsValue {
        match value {
            // Callables are opaque render inputs: copied, never keyed.
            PropsValue::Callable(_) => value.clone(),

            PropsValue::Object(map) => {
                // Array elements already have their index on the path.
                if let Some(key) = key {
                    self.path.push(PathSegment::Key(key.to_string()));
                }
                let template = self.walk_object(map);
                if key.is_some() {
                    self.path.pop();
                }
                PropsValue::Object(template)
            }

            PropsValue::Array(items) => {
                // Distinct lengths must not collide: shape differs.
                self.key_parts.push(format!("[{}", items.len()));
                if let Some(key) = key {
                    self.path.push(PathSegment::Key(key.to_string()));
                }
                let template = self.walk_array(items);
                if key.is_some() {
                    self.path.pop();
                }
                self.key_parts.push("]".to_string());
                PropsValue::Array(template)
            }

            PropsValue::String(s) => {
                let preserve_empty = s.is_empty()
                    && key.is_some_and(|k| self.policy.preserve_empty_keys.contains(k));
                if preserve_empty {
                    // Render logic may branch on presence/absence.
                    value.clone()
                } else {
                    self.placeholder(key, s)
                }
            }

            PropsValue::Number(_) | PropsValue::Bool(_) | PropsValue::Null => {
                let whitelisted =
                    key.is_some_and(|k| self.policy.whitelist_non_string_keys.contains(k));
                if whitelisted {
                    // Opt-in: the magnitude only affects displayed text.
                    self.placeholder_token(key, false)
                } else {
                    self.key_parts.push(canonical_json(value));
                    value.clone()
                }
            }
        }
    }

    fn walk_array(&mut self, items: &[PropsValue]) -> Vec<PropsValue> {
        let mut template = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            self.key_parts.push(i.to_string());
            self.path.push(PathSegment::Index(i));
            template.push(self.walk_value(None, item));
            self.path.pop();
        }
        template
    }

    /// Templatize a string leaf, splitting a URL-protocol prefix into the
    /// template when normalization is on.
    fn placeholder(&mut self, key: Option<&str>, value: &str) -> PropsValue {
        if self.strip_url_protocol {
            if let Some(prefix) = token::url_protocol_prefix(value) {
                let token_text = token::template_token(self.next_index);
                let templated = PropsValue::String(format!("{prefix}{token_text}"));
                self.record_lookup(key, true);
                return templated;
            }
        }
        self.placeholder_token(key, false)
    }

    fn placeholder_token(&mut self, key: Option<&str>, url_split: bool) -> PropsValue {
        let token_text = token::template_token(self.next_index);
        self.record_lookup(key, url_split);
        PropsValue::String(token_text)
    }

    fn record_lookup(&mut self, key: Option<&str>, url_split: bool) {
        let mut path = self.path.clone();
        if let Some(key) = key {
            path.push(PathSegment::Key(key.to_string()));
        }
        let lookup_key = token::lookup_token(self.next_index);
        self.key_parts.push(format!(":{lookup_key}"));
        self.lookup.insert(lookup_key, LookupEntry { path, url_split });
        self.next_index += 1;
    }
}
