//! Post-processing of cached templated output.
//!
//! Two independent passes:
//!
//! 1. [`restore_values`] substitutes real props values for placeholder
//!    tokens, escaping per the detected encoding and undoing the
//!    URL-protocol split applied at generation time.
//! 2. [`renumber_ids`] rewrites the renderer's per-render structural
//!    identifiers from the sentinel namespace used during miss-path
//!    renders to the caller's live counter. A no-op on marker-free text.

use regex::Captures;
use tracing::warn;

use crate::props::PropsValue;
use crate::template::Lookup;
use crate::token;

/// Escape a value for insertion into escaped markup contexts.
pub fn escape_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#x27;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Textual form of a substituted leaf value.
///
/// Strings substitute verbatim; whitelisted scalars render their display
/// form. Null renders as empty text.
fn display_value(value: &PropsValue) -> String {
    match value {
        PropsValue::String(s) => s.clone(),
        PropsValue::Number(n) => n.to_string(),
        PropsValue::Bool(b) => b.to_string(),
        PropsValue::Null => String::new(),
        other => crate::props::canonical_json(other),
    }
}

/// Substitute real values for every placeholder occurrence in `html`.
///
/// One scan resolves both placeholder encodings. When the matched token
/// carries a URL-protocol prefix that generation split out of the value,
/// the prefix is consumed and the caller's full value (with its own exact
/// protocol) substitutes the whole match.
pub fn restore_values(html: &str, lookup: &Lookup, real_props: &PropsValue) -> String {
    token::PLACEHOLDER_RE
        .replace_all(html, |caps: &Captures<'_>| {
            let lookup_key = token::lookup_token(&caps[3]);
            let Some(entry) = lookup.get(&lookup_key) else {
                // Not one of this render's placeholders; leave untouched.
                return caps[0].to_string();
            };

            let raw = token::is_raw_open(&caps[2]);
            let prefix = caps.get(1).map(|m| m.as_str()).unwrap_or("");

            let value = match real_props.get_path(&entry.path) {
                Some(value) => display_value(value),
                None => {
                    warn!(placeholder = %lookup_key, "placeholder path missing from props");
                    String::new()
                }
            };

            let substituted = if raw { value } else { escape_html(&value) };

            if entry.url_split {
                // Generation moved the protocol into the template literal;
                // consuming it here reproduces the caller's exact protocol.
                substituted
            } else {
                format!("{prefix}{substituted}")
            }
        })
        .into_owned()
}

/// Renumber structural identifiers starting from `*counter`, advancing it
/// past the last assigned id.
pub fn renumber_ids(html: &str, counter: &mut u64) -> String {
    token::IDENTIFIER_RE
        .replace_all(html, |caps: &Captures<'_>| {
            let id = *counter;
            *counter += 1;
            format!("{}{id}", &caps[1])
        })
        .into_owned()
}
