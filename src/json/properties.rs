//! Top-level property spans, used to splice properties in and out of a
//! specification without reformatting the rest of it.

use crate::edit::Edit;
use crate::json::errors::JsonError;
use crate::json::nodes::decode_string;
use crate::json::parser::ParsedSource;
use tree_sitter::Node;

/// Location of a top-level `"key": value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertySpan {
    pub key: String,
    pub pair_start: usize,
    pub pair_end: usize,
    pub value_start: usize,
    pub value_end: usize,
    /// Span to delete so the object stays well formed (pair plus one comma).
    pub removal_start: usize,
    pub removal_end: usize,
}

fn root_object<'t>(parsed: &'t ParsedSource<'_>) -> Result<Node<'t>, JsonError> {
    parsed
        .root_value()
        .filter(|node| node.kind() == "object")
        .ok_or(JsonError::RootNotObject)
}

/// Find a property of the root object by key.
pub fn top_level_property(
    parsed: &ParsedSource<'_>,
    key: &str,
) -> Result<Option<PropertySpan>, JsonError> {
    let object = root_object(parsed)?;
    let mut cursor = object.walk();
    let children: Vec<Node<'_>> = object.children(&mut cursor).collect();

    for (idx, child) in children.iter().enumerate() {
        if child.kind() != "pair" {
            continue;
        }
        let (Some(key_node), Some(value_node)) = (
            child.child_by_field_name("key"),
            child.child_by_field_name("value"),
        ) else {
            continue;
        };
        if decode_string(parsed.node_text(key_node)) != key {
            continue;
        }

        let next_comma = children[idx + 1..]
            .iter()
            .take_while(|n| n.kind() == "comment" || n.kind() == ",")
            .position(|n| n.kind() == ",")
            .map(|offset| idx + 1 + offset);
        let previous_comma = children[..idx]
            .iter()
            .rev()
            .take_while(|n| n.kind() == "comment" || n.kind() == ",")
            .find(|n| n.kind() == ",");

        let (removal_start, removal_end) = match (next_comma, previous_comma) {
            (Some(comma_idx), _) => {
                let end = children
                    .get(comma_idx + 1)
                    .map(|n| n.start_byte())
                    .unwrap_or_else(|| children[comma_idx].end_byte());
                (child.start_byte(), end)
            }
            (None, Some(comma)) => (comma.start_byte(), child.end_byte()),
            (None, None) => (child.start_byte(), child.end_byte()),
        };

        return Ok(Some(PropertySpan {
            key: key.to_string(),
            pair_start: child.start_byte(),
            pair_end: child.end_byte(),
            value_start: value_node.start_byte(),
            value_end: value_node.end_byte(),
            removal_start,
            removal_end,
        }));
    }

    Ok(None)
}

/// Build an edit that removes a top-level property.
pub fn remove_property_edit(
    parsed: &ParsedSource<'_>,
    key: &str,
) -> Result<Edit, JsonError> {
    let span = top_level_property(parsed, key)?.ok_or_else(|| JsonError::PropertyNotFound {
        key: key.to_string(),
    })?;
    let before = &parsed.source[span.removal_start..span.removal_end];
    Ok(Edit::new(span.removal_start, span.removal_end, "", before))
}

/// Build an edit that appends `"key": value_json` as the last property of the
/// root object, matching the indentation of the existing members.
pub fn append_property_edit(
    parsed: &ParsedSource<'_>,
    key: &str,
    value_json: &str,
) -> Result<Edit, JsonError> {
    let object = root_object(parsed)?;
    let mut cursor = object.walk();
    let children: Vec<Node<'_>> = object.children(&mut cursor).collect();
    let key_json = serde_json::to_string(key).map_err(|_| JsonError::ParseFailed)?;

    let last_pair = children.iter().rev().find(|n| n.kind() == "pair");
    match last_pair {
        Some(pair) => {
            let indent = " ".repeat(pair.start_position().column);
            let value = indent_continuation(value_json, &indent);
            let text = format!(",\n{indent}{key_json}: {value}");
            Ok(Edit::new(pair.end_byte(), pair.end_byte(), text, ""))
        }
        None => {
            let open = children
                .iter()
                .find(|n| n.kind() == "{")
                .ok_or(JsonError::RootNotObject)?;
            let value = indent_continuation(value_json, "  ");
            let text = format!("\n  {key_json}: {value}\n");
            Ok(Edit::new(open.end_byte(), open.end_byte(), text, ""))
        }
    }
}

fn indent_continuation(value: &str, indent: &str) -> String {
    let mut lines = value.lines();
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        out.push_str(indent);
        out.push_str(line);
    }
    out
}
