//! Cache-key hashing.
//!
//! Structural cache keys grow with the props tree; the hasher compacts
//! them to a fixed-width storage key. The built-in hasher lives behind the
//! `hash-keys` feature; when it is compiled out but hashing is requested,
//! the engine falls back to identity keys and warns once.

use std::fmt;
use std::sync::Arc;

#[cfg(not(feature = "hash-keys"))]
use once_cell::sync::OnceCell;
#[cfg(not(feature = "hash-keys"))]
use tracing::warn;

/// Pluggable key hashing step.
#[derive(Clone, Default)]
pub enum KeyHasher {
    /// Pass keys through unchanged.
    #[default]
    Identity,
    /// Built-in SHA-256-based compaction.
    #[cfg(feature = "hash-keys")]
    Builtin,
    /// Host-supplied hash function.
    Custom(CustomHashFn),
}

/// Host-supplied hash function.
#[derive(Clone)]
pub struct CustomHashFn(Arc<dyn Fn(&str) -> String + Send + Sync>);

impl CustomHashFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for CustomHashFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomHashFn(..)")
    }
}

impl fmt::Debug for KeyHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identity => f.write_str("Identity"),
            #[cfg(feature = "hash-keys")]
            Self::Builtin => f.write_str("Builtin"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl KeyHasher {
    /// Map a structural cache key to its storage key.
    pub fn hash(&self, key: &str) -> String {
        match self {
            Self::Identity => key.to_string(),
            #[cfg(feature = "hash-keys")]
            Self::Builtin => {
                use sha2::{Digest, Sha256};
                let digest = Sha256::digest(key.as_bytes());
                // 64 bits of digest is plenty for a per-process cache.
                hex::encode(&digest[..8])
            }
            Self::Custom(f) => (f.0)(key),
        }
    }

    /// The built-in hasher, or identity (with a one-time warning) when the
    /// `hash-keys` feature is compiled out.
    pub fn builtin_or_identity() -> Self {
        #[cfg(feature = "hash-keys")]
        {
            Self::Builtin
        }
        #[cfg(not(feature = "hash-keys"))]
        {
            static WARNED: OnceCell<()> = OnceCell::new();
            WARNED.get_or_init(|| {
                warn!(
                    fallback = "identity",
                    "built-in key hasher not compiled in (`hash-keys` feature), using unhashed keys"
                );
            });
            Self::Identity
        }
    }

    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }
}
