//! Generic block renderer
//!
//! Models without a dedicated renderer describe their state as an array of
//! JSON blocks; this renderer turns those into a text frame. Supported kinds:
//!
//! - `text`:  `{ kind, title?, text }`
//! - `kv`:    `{ kind, title?, items: [{ key, value }] }`
//! - `table`: `{ kind, title?, columns: [..], rows: [[..]] }`
//! - `code`:  `{ kind, title?, lines: [..], highlight_index? }`
//! - `list`:  `{ kind, title?, items: [".." | { text }] }`
//! - `tree`:  `{ kind, title?, root: { label, children?: [..] } }`
//!
//! Malformed blocks degrade to placeholder lines; rendering never fails.

use serde_json::Value;

use super::{SnapshotRenderer, Surface};
use crate::value::numeric;

/// Renderer for the generic block wire model.
pub struct BlockRenderer {
    surface: Surface,
}

impl BlockRenderer {
    /// Construct onto the given surface.
    pub fn new(surface: Surface) -> Self {
        Self { surface }
    }
}

impl SnapshotRenderer for BlockRenderer {
    fn draw(&mut self, state: &Value) {
        let mut lines = Vec::new();
        match state.as_array() {
            Some(blocks) => {
                for block in blocks {
                    render_block(block, &mut lines);
                }
            }
            None => lines.push("(invalid render data)".to_string()),
        }
        self.surface.replace(lines);
    }
}

fn render_block(block: &Value, out: &mut Vec<String>) {
    let Some(map) = block.as_object() else {
        out.push("(invalid block)".to_string());
        return;
    };

    if let Some(title) = map.get("title").and_then(Value::as_str) {
        out.push(format!("== {title} =="));
    }

    match map.get("kind").and_then(Value::as_str) {
        Some("text") => {
            out.push(text_of(map.get("text")));
        }
        Some("kv") => render_kv(map.get("items"), out),
        Some("table") => render_table(map.get("columns"), map.get("rows"), out),
        Some("code") => render_code(map.get("lines"), map.get("highlight_index"), out),
        Some("list") => render_list(map.get("items"), out),
        Some("tree") => render_tree(map.get("root"), out),
        Some(kind) => out.push(format!("(unknown block kind: {kind})")),
        None => out.push("(unknown block kind: ?)".to_string()),
    }
}

fn render_kv(items: Option<&Value>, out: &mut Vec<String>) {
    for item in array_of(items) {
        let key = item
            .get("key")
            .and_then(Value::as_str)
            .unwrap_or_default();
        let value = item.get("value").map(cell_text).unwrap_or_default();
        out.push(format!("{key}: {value}"));
    }
}

fn render_table(columns: Option<&Value>, rows: Option<&Value>, out: &mut Vec<String>) {
    let columns = array_of(columns);
    if !columns.is_empty() {
        let header: Vec<String> = columns.iter().map(cell_text).collect();
        out.push(header.join(" | "));
    }
    for row in array_of(rows) {
        let cells: Vec<String> = array_of(Some(row)).iter().map(cell_text).collect();
        out.push(cells.join(" | "));
    }
}

fn render_code(lines: Option<&Value>, highlight: Option<&Value>, out: &mut Vec<String>) {
    let lines = array_of(lines);
    // strict membership: out-of-range highlights select nothing
    let current = highlight.and_then(|raw| numeric::to_member_index(raw, lines.len()));
    for (idx, line) in lines.iter().enumerate() {
        let marker = if current == Some(idx) { ">" } else { " " };
        out.push(format!("{marker} {idx:>3} | {}", text_of(Some(line))));
    }
}

fn render_list(items: Option<&Value>, out: &mut Vec<String>) {
    for item in array_of(items) {
        let text = match item {
            Value::Object(map) => map
                .get("text")
                .map(cell_text)
                .unwrap_or_else(|| item.to_string()),
            other => cell_text(other),
        };
        out.push(format!("- {text}"));
    }
}

fn render_tree(root: Option<&Value>, out: &mut Vec<String>) {
    match root {
        Some(node) if !node.is_null() => render_tree_node(node, 0, out),
        _ => out.push("(empty tree)".to_string()),
    }
}

fn render_tree_node(node: &Value, depth: usize, out: &mut Vec<String>) {
    let label = node
        .get("label")
        .map(cell_text)
        .unwrap_or_default();
    out.push(format!("{}{label}", "  ".repeat(depth)));
    for child in array_of(node.get("children")) {
        render_tree_node(child, depth + 1, out);
    }
}

fn array_of(value: Option<&Value>) -> &[Value] {
    value.and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn text_of(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(text)) => text.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Cell formatting: strings verbatim, numeric encodings canonicalized to
/// decimal, everything else compact JSON.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => match numeric::to_canonical_integer(other) {
            Some(canonical) => canonical.to_decimal(),
            None => other.to_string(),
        },
    }
}
