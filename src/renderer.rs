//! Renderer seam.
//!
//! The engine never reaches into a renderer's internals; hosts implement
//! [`Renderer`] and the engine calls through it once per cache miss and
//! never on a hit.

/// Identifier counter value used during miss-path (templated) renders.
/// The renumbering pass rewrites ids from this namespace to the caller's
/// live counter.
pub const SENTINEL_ID_START: u64 = 1;

/// External tree renderer: turns a props tree into markup text.
pub trait Renderer {
    fn render(
        &self,
        name: &str,
        props: &crate::props::PropsValue,
        ctx: &mut RenderContext,
    ) -> String;
}

/// Per-render-invocation state threaded through nested renders.
#[derive(Debug, Clone)]
pub struct RenderContext {
    /// Next structural identifier the renderer will assign.
    pub id_counter: u64,
    /// Name of the component currently being rendered from a template
    /// (miss path), if any. Nested renders under it must not cache.
    pub caching_owner: Option<String>,
    /// Static-markup mode: the renderer embeds no structural identifiers,
    /// so renumbering is skipped.
    pub static_markup: bool,
}

impl RenderContext {
    pub fn new() -> Self {
        Self {
            id_counter: SENTINEL_ID_START,
            caching_owner: None,
            static_markup: false,
        }
    }

    pub fn static_markup() -> Self {
        Self {
            static_markup: true,
            ..Self::new()
        }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}
