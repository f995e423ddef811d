use thiserror::Error;

/// Errors surfaced to render call-sites.
///
/// Cache inconsistencies and hasher fallback are handled internally
/// (blacklisting and identity keys respectively) and never reach callers.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("unknown caching strategy `{strategy}` for component `{component}`")]
    UnknownStrategy { component: String, strategy: String },
}
