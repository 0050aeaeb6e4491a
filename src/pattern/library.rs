use crate::cache;
use crate::field::is_identifier;
use crate::pattern::errors::PatternError;
use crate::pattern::escape::{escape, escape_template};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Syntactic context a field reference can appear in, in application order.
///
/// The order goes from most to least specific so that a reference is claimed
/// by its own context before a looser one can see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceContext {
    /// The whole JSON string is the name: `"Sales"`.
    Bare,
    /// Dot accessor ending an expression substring: `datum.Sales'`.
    DotQuoted,
    /// `datum[\'Sales\']`
    BracketEscapedSingle,
    /// `datum[\"Sales\"]`
    BracketEscapedDouble,
    /// `datum.Sales`
    Dot,
    /// `datum['Sales']`
    BracketSingle,
    /// `datum["Sales"]`
    BracketDouble,
    /// `_{Sales}_`
    Token,
}

impl ReferenceContext {
    pub const ALL: [ReferenceContext; 8] = [
        ReferenceContext::Bare,
        ReferenceContext::DotQuoted,
        ReferenceContext::BracketEscapedSingle,
        ReferenceContext::BracketEscapedDouble,
        ReferenceContext::Dot,
        ReferenceContext::BracketSingle,
        ReferenceContext::BracketDouble,
        ReferenceContext::Token,
    ];

    /// Left and right delimiter patterns around the name group.
    fn delimiters(self) -> (&'static str, &'static str) {
        match self {
            ReferenceContext::Bare => (r#"(")"#, r#"(")"#),
            ReferenceContext::DotQuoted => (r"(\bdatum\.)", r#"(\\?['"])"#),
            ReferenceContext::BracketEscapedSingle => (r"(\bdatum\[\\')", r"(\\'\])"),
            ReferenceContext::BracketEscapedDouble => (r#"(\bdatum\[\\")"#, r#"(\\"\])"#),
            ReferenceContext::Dot => (r"(\bdatum\.)", r"([^\w$]|$)"),
            ReferenceContext::BracketSingle => (r"(\bdatum\[')", r"('\])"),
            ReferenceContext::BracketDouble => (r#"(\bdatum\[")"#, r#"("\])"#),
            ReferenceContext::Token => (r"(_\{)", r"(\}_)"),
        }
    }

    /// Dot accessors only accept identifiers; anything else needs brackets.
    fn is_dot_accessor(self) -> bool {
        matches!(self, ReferenceContext::DotQuoted | ReferenceContext::Dot)
    }
}

/// Derived-field suffixes that may trail a field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuffixFamily {
    /// Cross-highlight companions (`Sales__highlight`, ...).
    CrossHighlight,
    /// Number-format companions (`Sales__format`, ...).
    NumberFormat,
}

impl SuffixFamily {
    pub const ALL: [SuffixFamily; 2] = [SuffixFamily::CrossHighlight, SuffixFamily::NumberFormat];

    pub fn suffixes(self) -> &'static [&'static str] {
        match self {
            SuffixFamily::CrossHighlight => {
                &["__highlightComparator", "__highlightStatus", "__highlight"]
            }
            SuffixFamily::NumberFormat => &["__formatted", "__format"],
        }
    }

    /// Non-capturing optional alternation, longest suffix first.
    fn alternation(self) -> String {
        format!("(?:{})?", self.suffixes().join("|"))
    }
}

/// A search pattern paired with its substitution template.
///
/// Template syntax: `$1`/`${1}` insert a capture group, `${suffix}` inserts
/// whatever followed the search key in group 2, `$$` is a literal `$`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternReplacer {
    pub pattern: String,
    pub replacer: String,
}

impl PatternReplacer {
    pub fn new(pattern: impl Into<String>, replacer: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacer: replacer.into(),
        }
    }
}

fn pattern_for(escaped_name: &str, context: ReferenceContext, family: SuffixFamily) -> String {
    let (left, right) = context.delimiters();
    format!("{left}({escaped_name}{}){right}", family.alternation())
}

/// Every context/suffix combination, in application order.
fn combinations() -> impl Iterator<Item = (ReferenceContext, SuffixFamily)> {
    ReferenceContext::ALL.into_iter().flat_map(|context| {
        SuffixFamily::ALL
            .into_iter()
            .map(move |family| (context, family))
    })
}

/// Existence-test patterns for `name`, one per context and suffix family.
pub fn literal_patterns(name: &str) -> Vec<String> {
    let escaped = escape(name);
    combinations()
        .map(|(context, family)| pattern_for(&escaped, context, family))
        .collect()
}

/// Patterns that rewrite references to `search` as references to `replacement`.
pub fn replacement_patterns(search: &str, replacement: &str) -> Vec<PatternReplacer> {
    let escaped = escape(search);
    let literal = escape_template(replacement);
    let bare_identifier = is_identifier(replacement);

    combinations()
        .map(|(context, family)| {
            let replacer = if context.is_dot_accessor() && !bare_identifier {
                format!("datum['{literal}${{suffix}}']${{3}}")
            } else {
                format!("${{1}}{literal}${{suffix}}${{3}}")
            };
            PatternReplacer::new(pattern_for(&escaped, context, family), replacer)
        })
        .collect()
}

/// Compile the literal patterns for `name`, failing on the first bad one.
pub fn compile_literal(name: &str) -> Result<Vec<Regex>, PatternError> {
    literal_patterns(name)
        .into_iter()
        .map(|pattern| {
            cache::get_or_compile_regex(&pattern).map_err(|e| PatternError::Compile {
                field: name.to_string(),
                pattern,
                message: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches_any(name: &str, text: &str) -> bool {
        compile_literal(name)
            .unwrap()
            .iter()
            .any(|re| re.is_match(text))
    }

    #[test]
    fn sixteen_patterns_per_field() {
        assert_eq!(literal_patterns("Sales").len(), 16);
        assert_eq!(replacement_patterns("Sales", "__0__").len(), 16);
    }

    #[test]
    fn every_pattern_has_three_groups() {
        for re in compile_literal("Sales (EUR)").unwrap() {
            assert_eq!(re.captures_len(), 4, "{re}");
        }
    }

    #[test]
    fn recognizes_each_context() {
        let cases = [
            r#""Sales""#,
            r#""datum.Sales""#,
            r#""datum[\'Sales\']""#,
            r#""datum[\"Sales\"]""#,
            r#""datum.Sales * 2""#,
            r#""datum['Sales']""#,
            r#"datum["Sales"]"#,
            r#""Total: _{Sales}_""#,
        ];
        for text in cases {
            assert!(matches_any("Sales", text), "no match in {text}");
        }
    }

    #[test]
    fn recognizes_suffixes() {
        assert!(matches_any("Sales", r#""Sales__highlight""#));
        assert!(matches_any("Sales", r#""Sales__highlightStatus""#));
        assert!(matches_any("Sales", r#""datum['Sales__highlightComparator']""#));
        assert!(matches_any("Sales", r#""datum.Sales__formatted""#));
        assert!(matches_any("Sales", r#""_{Sales__format}_""#));
    }

    #[test]
    fn ignores_partial_names() {
        assert!(!matches_any("Sales", r#""Sales Amount""#));
        assert!(!matches_any("Sales", r#""datum['Sales Amount']""#));
        assert!(!matches_any("Sales", r#""datum.SalesAmount""#));
        assert!(!matches_any("Sales", r#""mydatum.Sales""#));
        assert!(!matches_any("Sales", r#""Sales__highlightX""#));
        assert!(!matches_any("Sales", r#""PreSales""#));
    }

    #[test]
    fn metacharacters_in_names_are_literal() {
        assert!(matches_any("Profit (%)", r#""datum['Profit (%)']""#));
        assert!(!matches_any("a.b", r#""axb""#));
        assert!(matches_any("$ Sales", r#""$ Sales""#));
    }

    #[test]
    fn dot_contexts_rewrap_non_identifiers() {
        let replacers = replacement_patterns("__0__", "Sales Amount");
        let dot: Vec<_> = replacers
            .iter()
            .filter(|r| r.replacer.starts_with("datum['"))
            .collect();
        assert_eq!(dot.len(), 4);

        let identifier = replacement_patterns("Sales", "__0__");
        assert!(identifier.iter().all(|r| r.replacer.starts_with("${1}")));
    }

    #[test]
    fn replacement_text_is_template_safe() {
        let replacers = replacement_patterns("__0__", "$ Sales");
        assert!(replacers[0].replacer.contains("$$ Sales"));
    }
}
