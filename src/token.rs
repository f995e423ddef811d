//! Placeholder token grammar.
//!
//! The exact token format is an implementation detail owned by this module;
//! nothing else in the crate spells out marker characters. Template tokens
//! use the quote pair `@'N"@` so that a renderer's own attribute escaping
//! turns them into a recognizably different encoding (`@&#x27;N&quot;@`):
//! the raw form marks positions that must be substituted without further
//! escaping, the escaped form marks positions inside escaped markup.

use once_cell::sync::Lazy;
use regex::Regex;

/// Raw open marker as emitted into templates.
const RAW_OPEN: &str = "@'";
/// Attribute/text-escaped open marker as it survives a renderer's own
/// escaping pass.
const ESCAPED_OPEN: &str = "@&#x27;";

/// Structural identifier markers the renderer embeds into markup.
/// The renumbering pass rewrites the number following either marker.
pub const ID_ATTR_MARKER: &str = "data-ssrid=\"";
pub const ID_TEXT_MARKER: &str = "ssr-text: ";

/// Template placeholder for index `i`, as embedded in template trees.
pub fn template_token(index: usize) -> String {
    format!("{RAW_OPEN}{index}\"@")
}

/// Lookup token for index `i`, used as the key into a render's lookup map.
pub fn lookup_token(index: impl std::fmt::Display) -> String {
    format!("@{index}@")
}

/// Matches one placeholder occurrence in rendered output.
///
/// Capture groups: optional URL-protocol prefix, open marker (raw or
/// escaped), placeholder index, close marker.
pub static PLACEHOLDER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(https?://)?(@'|@&#x27;)([0-9]+)("@|&quot;@)"#)
        .expect("placeholder pattern is valid")
});

/// Matches a structural identifier marker plus the digits to renumber.
pub static IDENTIFIER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(data-ssrid="|ssr-text: )[0-9]*"#).expect("identifier pattern is valid")
});

/// True when the open marker capture means "substitute without escaping".
pub fn is_raw_open(open: &str) -> bool {
    open == RAW_OPEN
}

/// URL-protocol prefix split out of a string at template-generation time,
/// if normalization is on and the value starts with a known protocol.
pub fn url_protocol_prefix(value: &str) -> Option<&'static str> {
    let lower_starts = |prefix: &str| {
        value
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
    };
    if lower_starts("http://") {
        Some("http://")
    } else if lower_starts("https://") {
        Some("https://")
    } else {
        None
    }
}
