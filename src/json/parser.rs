use crate::json::errors::JsonError;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Parser, Tree};

/// Tree-sitter parser for JSON with comments.
///
/// The tree-sitter JSON grammar treats `//` and `/* */` comments as extras,
/// so a JSONC specification parses into a concrete syntax tree that still
/// carries every comment and whitespace run as byte spans.
pub struct JsonParser {
    parser: Parser,
}

impl JsonParser {
    pub fn new() -> Result<Self, JsonError> {
        let mut parser = Parser::new();
        let ts_lang = SupportLang::Json.get_ts_language();
        parser
            .set_language(&ts_lang)
            .map_err(|_| JsonError::LanguageSet)?;

        Ok(Self { parser })
    }

    /// Parse source text into a tree-sitter Tree.
    pub fn parse(&mut self, source: &str) -> Result<Tree, JsonError> {
        self.parser
            .parse(source, None)
            .ok_or(JsonError::ParseFailed)
    }

    /// Parse source text and return the tree along with the source.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, JsonError> {
        let tree = self.parse(source)?;
        Ok(ParsedSource { source, tree })
    }
}

/// A parsed specification with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    /// Check if the tree contains any ERROR or MISSING nodes.
    pub fn has_errors(&self) -> bool {
        has_error_nodes(self.tree.root_node())
    }

    /// Get all ERROR nodes in the tree.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &mut errors);
        errors
    }

    /// Fail unless the tree is free of ERROR and MISSING nodes.
    pub fn check_syntax(&self) -> Result<(), JsonError> {
        let errors = self.error_nodes();
        match errors.as_slice() {
            [] => Ok(()),
            [only] => Err(JsonError::SyntaxError {
                byte_start: only.byte_start,
                byte_end: only.byte_end,
            }),
            _ => Err(JsonError::MultipleSyntaxErrors {
                count: errors.len(),
            }),
        }
    }

    /// Extract text for a node's byte range.
    pub fn node_text(&self, node: tree_sitter::Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }

    /// The first non-comment value under the document node.
    pub fn root_value(&self) -> Option<tree_sitter::Node<'_>> {
        let root = self.tree.root_node();
        let mut cursor = root.walk();
        let value = root
            .named_children(&mut cursor)
            .find(|child| child.kind() != "comment");
        value
    }
}

/// Information about an ERROR node in the parse tree.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
    pub end_point: tree_sitter::Point,
}

fn has_error_nodes(node: tree_sitter::Node<'_>) -> bool {
    if node.is_error() || node.is_missing() {
        return true;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if has_error_nodes(child) {
            return true;
        }
    }

    false
}

fn collect_error_nodes(node: tree_sitter::Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        errors.push(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            start_point: node.start_position(),
            end_point: node.end_position(),
        });
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}
