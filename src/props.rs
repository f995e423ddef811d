//! Props tree data model.
//!
//! A render invocation is described by a [`PropsValue`] tree. Object keys
//! live in a `BTreeMap`, so enumeration order is deterministic between
//! calls — cache keys are derived directly from that order.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use tracing::warn;

/// Object node of a props tree. Sorted keys keep traversal deterministic.
pub type PropsMap = BTreeMap<String, PropsValue>;

/// One node of a props tree.
///
/// Closed set of node kinds: scalars, callables (opaque, never
/// templatized), objects and ordered sequences.
#[derive(Clone)]
pub enum PropsValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Array(Vec<PropsValue>),
    Object(PropsMap),
    Callable(Callable),
}

/// Opaque callable prop.
///
/// The engine never invokes or serializes callables; they are copied into
/// templates verbatim and compared by identity.
#[derive(Clone)]
pub struct Callable(Arc<dyn Fn(&PropsValue) -> PropsValue + Send + Sync>);

impl Callable {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&PropsValue) -> PropsValue + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the wrapped function. Provided for hosts; the engine itself
    /// never calls this.
    pub fn call(&self, arg: &PropsValue) -> PropsValue {
        (self.0)(arg)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Callable(..)")
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PropsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Bool(b) => write!(f, "Bool({b})"),
            Self::Number(n) => write!(f, "Number({n})"),
            Self::String(s) => write!(f, "String({s:?})"),
            Self::Array(items) => f.debug_list().entries(items).finish(),
            Self::Object(map) => f.debug_map().entries(map).finish(),
            Self::Callable(c) => c.fmt(f),
        }
    }
}

impl PartialEq for PropsValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Callable(a), Self::Callable(b)) => a == b,
            _ => false,
        }
    }
}

/// One step of a path into a props tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Ordered path from the root of a props tree to a leaf.
pub type PropsPath = Vec<PathSegment>;

impl PropsValue {
    /// Follow a path into the tree.
    pub fn get_path(&self, path: &[PathSegment]) -> Option<&PropsValue> {
        let mut node = self;
        for segment in path {
            node = match (node, segment) {
                (PropsValue::Object(map), PathSegment::Key(key)) => map.get(key)?,
                (PropsValue::Array(items), PathSegment::Index(i)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(node)
    }

    pub fn as_object(&self) -> Option<&PropsMap> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// True for an object with no keys. Non-objects are never considered
    /// cacheable props, so they also report empty.
    pub fn is_empty_props(&self) -> bool {
        match self {
            Self::Object(map) => map.is_empty(),
            _ => true,
        }
    }

    /// True when a `children` key holds a structured (object/array) value,
    /// meaning this node's content is injected externally.
    pub fn has_structured_children(&self) -> bool {
        matches!(
            self.as_object().and_then(|map| map.get("children")),
            Some(Self::Object(_)) | Some(Self::Array(_))
        )
    }
}

impl From<serde_json::Value> for PropsValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => Self::Object(
                map.into_iter()
                    .map(|(k, v)| (k, Self::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for PropsValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut ser = serializer.serialize_map(Some(map.len()))?;
                for (k, v) in map {
                    ser.serialize_entry(k, v)?;
                }
                ser.end()
            }
            // Callables are not render data; a fixed tag keeps literal
            // serialization total without leaking anything.
            Self::Callable(_) => serializer.serialize_str("[fn]"),
        }
    }
}

/// Canonical JSON form of a props node, used for inlined cache-key
/// literals and simple-strategy keys.
pub fn canonical_json(value: &PropsValue) -> String {
    match serde_json::to_string(value) {
        Ok(s) => s,
        Err(err) => {
            warn!(error = %err, "props serialization failed, using null literal");
            "null".to_string()
        }
    }
}
