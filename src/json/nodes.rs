//! String-node extraction with JSONPath locations.
//!
//! The locator only ever inspects string literals: property values, array
//! elements and object keys. This module flattens a parsed specification
//! into that list, in document order, each with the JSONPath of the value
//! (or, for keys, of the property) it belongs to.

use crate::field::is_identifier;
use crate::json::parser::ParsedSource;
use tree_sitter::Node;

/// One step of a JSONPath.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Render segments as a JSONPath expression (`$.layer[0].encoding.x`).
pub fn json_path(segments: &[PathSegment]) -> String {
    let mut path = String::from("$");
    for segment in segments {
        match segment {
            PathSegment::Key(key) if is_identifier(key) => {
                path.push('.');
                path.push_str(key);
            }
            PathSegment::Key(key) => {
                path.push_str("['");
                path.push_str(&key.replace('\\', "\\\\").replace('\'', "\\'"));
                path.push_str("']");
            }
            PathSegment::Index(index) => {
                path.push_str(&format!("[{index}]"));
            }
        }
    }
    path
}

/// A string literal found in the specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringNode {
    pub byte_start: usize,
    pub byte_end: usize,
    /// Source text of the literal, quotes included.
    pub raw: String,
    /// JSONPath of the value, or of the property when `is_key`.
    pub path: String,
    pub is_key: bool,
}

/// Decode the text of a JSON string literal, falling back to its raw content.
pub fn decode_string(raw: &str) -> String {
    serde_json::from_str::<String>(raw).unwrap_or_else(|_| {
        raw.strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(raw)
            .to_string()
    })
}

/// Collect every string literal in document order.
pub fn string_nodes(parsed: &ParsedSource<'_>) -> Vec<StringNode> {
    let mut out = Vec::new();
    let mut segments = Vec::new();
    if let Some(root) = parsed.root_value() {
        collect(parsed, root, &mut segments, &mut out);
    }
    out
}

fn push_string(
    parsed: &ParsedSource<'_>,
    node: Node<'_>,
    segments: &[PathSegment],
    is_key: bool,
    out: &mut Vec<StringNode>,
) {
    out.push(StringNode {
        byte_start: node.start_byte(),
        byte_end: node.end_byte(),
        raw: parsed.node_text(node).to_string(),
        path: json_path(segments),
        is_key,
    });
}

fn collect(
    parsed: &ParsedSource<'_>,
    node: Node<'_>,
    segments: &mut Vec<PathSegment>,
    out: &mut Vec<StringNode>,
) {
    match node.kind() {
        "object" => {
            let mut cursor = node.walk();
            for pair in node.named_children(&mut cursor) {
                if pair.kind() != "pair" {
                    continue;
                }
                let Some(key) = pair.child_by_field_name("key") else {
                    continue;
                };
                segments.push(PathSegment::Key(decode_string(parsed.node_text(key))));
                if key.kind() == "string" {
                    push_string(parsed, key, segments, true, out);
                }
                if let Some(value) = pair.child_by_field_name("value") {
                    collect(parsed, value, segments, out);
                }
                segments.pop();
            }
        }
        "array" => {
            let mut cursor = node.walk();
            let elements = node
                .named_children(&mut cursor)
                .filter(|child| child.kind() != "comment");
            for (index, element) in elements.enumerate() {
                segments.push(PathSegment::Index(index));
                collect(parsed, element, segments, out);
                segments.pop();
            }
        }
        "string" => push_string(parsed, node, segments, false, out),
        _ => {}
    }
}
