//! Single-key tagged-union extraction for wire payloads
//!
//! Serde externally-tagged enums arrive as objects with exactly one key: the
//! variant tag. Renderers walk model state without knowing its enum, so this
//! module performs that decoding generically. Closed contracts (step results,
//! render blocks) do not use this — they deserialize into explicit Rust enums;
//! this is the wire-level step for genuinely open, model-specific payloads.

use serde_json::Value;

/// A decoded `(tag, payload)` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant<'a> {
    /// The single key naming the variant
    pub tag: &'a str,
    /// The payload stored under the tag
    pub value: &'a Value,
}

/// Decode `node` as a single-key tagged union.
///
/// Returns `None` unless `node` is an object with exactly one key.
pub fn extract(node: &Value) -> Option<Variant<'_>> {
    let map = node.as_object()?;
    if map.len() != 1 {
        return None;
    }
    let (tag, value) = map.iter().next()?;
    Some(Variant { tag, value })
}

/// Decode `node` as a tagged union, treating a bare string as a
/// self-describing tag with itself as payload.
///
/// Some models emit unit variants as plain strings; others never do and must
/// not have strings promoted to tags. Call sites pick the rule that matches
/// their model — the two entry points are intentionally separate.
pub fn extract_or_string(node: &Value) -> Option<Variant<'_>> {
    if let Value::String(text) = node {
        return Some(Variant {
            tag: text,
            value: node,
        });
    }
    extract(node)
}

/// View `value` as a tuple of exactly `n` slots.
///
/// A sequence of length ≥ `n` fills every slot; a scalar fills a 1-tuple;
/// anything else yields all-`None`. Malformed input never errors — callers
/// render `"?"` placeholders for missing slots.
pub fn as_tuple(value: &Value, n: usize) -> Vec<Option<&Value>> {
    if let Some(items) = value.as_array() {
        if items.len() >= n {
            return items.iter().take(n).map(Some).collect();
        }
    } else if n == 1 && !value.is_null() {
        return vec![Some(value)];
    }
    vec![None; n]
}
