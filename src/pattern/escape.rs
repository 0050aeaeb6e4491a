//! The one place where untrusted text is made safe for a regex.
//!
//! Field names come straight from the host dataset. Every pattern that embeds
//! a name goes through [`escape`]; nothing else in the crate builds a pattern
//! from raw field text.

/// Characters with meaning in a pattern (or inside a character class).
const METACHARACTERS: &[char] = &[
    '-', '/', '\\', '^', '$', '*', '+', '?', '.', '(', ')', '&', '|', '[', ']', '{', '}',
];

/// Escape regex metacharacters in `value` with a leading backslash.
pub fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if METACHARACTERS.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape `value` for use as literal text in a replacement template.
///
/// Templates treat `$` as the start of a back-reference.
pub fn escape_template(value: &str) -> String {
    value.replace('$', "$$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    #[test]
    fn escapes_dollar_and_dot() {
        assert_eq!(escape("$ Sales.Current"), r"\$ Sales\.Current");
    }

    #[test]
    fn leaves_plain_names_alone() {
        assert_eq!(escape("Sales_Current"), "Sales_Current");
        assert_eq!(escape("abc123"), "abc123");
        assert_eq!(escape("Sales Amount"), "Sales Amount");
    }

    #[test]
    fn escapes_every_metacharacter() {
        let all = r"-/\^$*+?.()&|[]{}";
        let escaped = escape(all);
        assert_eq!(escaped, r"\-\/\\\^\$\*\+\?\.\(\)\&\|\[\]\{\}");
    }

    #[test]
    fn escaped_names_match_themselves_literally() {
        for name in [
            "$ Sales.Current",
            "Profit (%)",
            "a+b*c?",
            "Region|Country",
            "{weird}[name]",
            r"back\slash",
            "x^2 - y/2 & z",
        ] {
            let re = Regex::new(&format!("^{}$", escape(name))).unwrap();
            assert!(re.is_match(name), "{name} should match itself");
            assert!(!re.is_match(&format!("{name}!")), "{name} should be anchored");
        }
    }

    #[test]
    fn template_escaping_doubles_dollars() {
        assert_eq!(escape_template("$ Sales"), "$$ Sales");
        assert_eq!(escape_template("Sales"), "Sales");
    }
}
