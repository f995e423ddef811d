//! Templated render-cache engine.
//!
//! Memoizes the textual output of pure tree-shaped rendering functions so
//! repeated renders of structurally-identical props trees skip
//! recomputation, while the returned text still reflects the caller's
//! exact current values and per-render identifiers.
//!
//! Two per-component strategies:
//!
//! - **Simple**: the whole output is cached under a key projected from the
//!   props and reused byte-for-byte.
//! - **Template**: one traversal of the props tree produces a placeholder
//!   template, a structural cache key and a placeholder→path lookup; the
//!   stored fragment is rendered from the template and each later render
//!   reinjects its own leaf values (and renumbers structural identifiers).
//!
//! ## Usage
//!
//! ```ignore
//! let engine = CacheEngine::new(EngineConfig::default());
//! engine.set_caching_config(serde_json::from_str(r#"{
//!     "components": {
//!         "Hello": {"strategy": "template", "enable": true}
//!     }
//! }"#)?);
//! engine.enable_caching(true);
//!
//! let mut ctx = RenderContext::new();
//! let html = engine.render_cached("Hello", &props, &my_renderer, &mut ctx)?;
//! ```

mod config;
mod engine;
mod error;
mod hash;
mod lock;
mod policy;
mod props;
mod resolve;
mod store;
mod template;
mod token;

pub mod renderer;

pub use config::EngineConfig;
pub use engine::{CacheDecision, CacheEngine};
pub use error::CacheError;
pub use hash::{CustomHashFn, KeyHasher};
pub use policy::{CachingConfig, ComponentPolicy, CustomKeyFn, Strategy};
pub use props::{Callable, PathSegment, PropsMap, PropsPath, PropsValue, canonical_json};
pub use renderer::{RenderContext, Renderer, SENTINEL_ID_START};
pub use resolve::{escape_html, renumber_ids, restore_values};
pub use store::{CacheEntry, CacheStore};
pub use template::{Generated, Lookup, LookupEntry, generate};
pub use token::{ID_ATTR_MARKER, ID_TEXT_MARKER, lookup_token, template_token};
