//! Regex pattern library for field references.
//!
//! A field can be referenced from eight syntactic contexts of the grammar,
//! and each reference may carry a cross-highlight or number-format suffix.
//! This module turns a field name into the ordered set of patterns that find
//! (and optionally rewrite) all of them. Every pattern has exactly three
//! capture groups: left delimiter, name plus optional suffix, right
//! delimiter.

pub mod errors;
pub mod escape;
pub mod library;

pub use errors::PatternError;
pub use escape::{escape, escape_template};
pub use library::{
    compile_literal, literal_patterns, replacement_patterns, PatternReplacer, ReferenceContext,
    SuffixFamily,
};
