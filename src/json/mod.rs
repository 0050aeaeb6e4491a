//! JSONC parsing for specifications.
//!
//! Specifications are parsed into a tree-sitter concrete syntax tree, which
//! keeps comments and formatting as byte spans. Nothing here rewrites text
//! directly: callers get string nodes with JSONPath locations, or property
//! spans to feed into [`crate::edit::Edit`].

pub mod errors;
pub mod nodes;
pub mod parser;
pub mod properties;

pub use errors::JsonError;
pub use nodes::{decode_string, json_path, string_nodes, PathSegment, StringNode};
pub use parser::{ErrorNode, JsonParser, ParsedSource};
pub use properties::{append_property_edit, remove_property_edit, top_level_property, PropertySpan};
