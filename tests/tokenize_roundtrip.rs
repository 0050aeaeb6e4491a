//! Property tests for tokenizing and detokenizing specifications.

use field_tracker::tracking::{TemplateFieldMetadata, TrackedFieldProperties, TrackedFields};
use field_tracker::{detokenize, tokenize_for_export};
use proptest::prelude::*;

const SUFFIXES: &[&str] = &[
    "",
    "__highlight",
    "__highlightStatus",
    "__highlightComparator",
    "__format",
    "__formatted",
];

/// Tracking for a single field as it looks after a locator run: keyed by the
/// name, resolved to itself.
fn tracked(name: &str, placeholder: &str) -> TrackedFields {
    let mut props = TrackedFieldProperties::new(placeholder);
    props.is_in_dataset = true;
    props.is_in_specification = true;
    props.template_metadata = Some(TemplateFieldMetadata {
        key: placeholder.to_string(),
        name: name.to_string(),
        ..Default::default()
    });
    let mut fields = TrackedFields::new();
    fields.insert(name.to_string(), props);
    fields
}

fn identifier_spec(name: &str, suffix: &str) -> String {
    format!(
        r#"{{
  "mark": "bar",
  "encoding": {{"y": {{"field": "{name}{suffix}"}}}},
  "transform": [
    {{"calculate": "datum.{name}{suffix} > 0 ? datum['{name}{suffix}'] : 0", "as": "Clamped"}},
    {{"calculate": "datum[\'{name}{suffix}\'] + 1", "as": "Escaped"}},
    {{"filter": "datum[\"{name}{suffix}\"] != null"}}
  ],
  "signal": "'datum.{name}{suffix}' + \"datum.{name}{suffix}\"",
  "title": "_{{{name}{suffix}}}_ by month"
}}"#
    )
}

/// Non-identifier names cannot use dot accessors.
fn bracket_spec(name: &str, suffix: &str) -> String {
    format!(
        r#"{{
  "encoding": {{"y": {{"field": "{name}{suffix}"}}}},
  "transform": [
    {{"calculate": "datum['{name}{suffix}'] * 2", "as": "Doubled"}},
    {{"calculate": "datum[\'{name}{suffix}\'] + datum[\"{name}{suffix}\"]", "as": "Summed"}},
    {{"filter": "datum[\"{name}{suffix}\"] != null"}}
  ],
  "title": "_{{{name}{suffix}}}_"
}}"#
    )
}

fn suffix() -> impl Strategy<Value = &'static str> {
    proptest::sample::select(SUFFIXES)
}

proptest! {
    #[test]
    fn identifier_names_round_trip(name in "[A-Z][A-Za-z0-9]{1,10}", suffix in suffix()) {
        let spec = identifier_spec(&name, suffix);
        let fields = tracked(&name, "__0__");

        let tokenized = tokenize_for_export(&spec, &fields, &[]);
        prop_assert!(tokenized.skipped.is_empty());
        let field = format!("\"field\": \"__0__{suffix}\"");
        prop_assert!(tokenized.spec.contains(&field));
        let dot = format!("datum.__0__{suffix} > 0");
        prop_assert!(tokenized.spec.contains(&dot));
        let escaped = format!(r"datum[\'__0__{suffix}\']");
        prop_assert!(tokenized.spec.contains(&escaped));
        let quoted = format!(r#""'datum.__0__{suffix}' + \"datum.__0__{suffix}\"""#);
        prop_assert!(tokenized.spec.contains(&quoted));

        let restored = detokenize(&tokenized.spec, &fields, &[]);
        prop_assert_eq!(restored.spec, spec);
    }

    #[test]
    fn names_with_metacharacters_round_trip(
        name in r"[A-Z][A-Za-z0-9 ()+*?$/&|^-]{0,8}[a-z]",
        suffix in suffix(),
    ) {
        let spec = bracket_spec(&name, suffix);
        let fields = tracked(&name, "__4__");

        let tokenized = tokenize_for_export(&spec, &fields, &[]);
        prop_assert!(tokenized.skipped.is_empty());
        let plain = format!("\"__4__{suffix}\"");
        prop_assert!(tokenized.spec.contains(&plain));
        let bracketed = format!("datum['__4__{suffix}']");
        prop_assert!(tokenized.spec.contains(&bracketed));
        let escaped = format!(r#"datum[\'__4__{suffix}\'] + datum[\"__4__{suffix}\"]"#);
        prop_assert!(tokenized.spec.contains(&escaped));

        let restored = detokenize(&tokenized.spec, &fields, &[]);
        prop_assert_eq!(restored.spec, spec);
    }

    #[test]
    fn tokenizing_is_idempotent(name in "[A-Z][A-Za-z0-9]{1,10}", suffix in suffix()) {
        let spec = identifier_spec(&name, suffix);
        let fields = tracked(&name, "__0__");

        let once = tokenize_for_export(&spec, &fields, &[]);
        let twice = tokenize_for_export(&once.spec, &fields, &[]);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn longer_names_are_not_split(name in "[A-Z][a-z]{2,8}", tail in "[a-z]{1,4}") {
        let longer = format!("{name}{tail}");
        let spec = format!(r#"{{"a": "{longer}", "b": "datum.{longer} + datum['{longer}']"}}"#);

        let tokenized = tokenize_for_export(&spec, &tracked(&name, "__0__"), &[]);
        prop_assert_eq!(tokenized.spec, spec);
    }
}

#[test]
fn each_suffix_is_kept_whole() {
    let spec = r#"{"a": "Sales__highlightComparator", "b": "datum.Sales__highlightStatus", "c": "datum['Sales__formatted']"}"#;
    let tokenized = tokenize_for_export(spec, &tracked("Sales", "__2__"), &[]);
    assert_eq!(
        tokenized.spec,
        r#"{"a": "__2____highlightComparator", "b": "datum.__2____highlightStatus", "c": "datum['__2____formatted']"}"#
    );
}

#[test]
fn quoted_dot_accessor_in_expression_string() {
    let spec = r#"{"signal": "'datum.Sales' + \"datum.Sales\""}"#;
    let tokenized = tokenize_for_export(spec, &tracked("Sales", "__0__"), &[]);
    assert_eq!(
        tokenized.spec,
        r#"{"signal": "'datum.__0__' + \"datum.__0__\""}"#
    );
}

#[test]
fn remap_to_non_identifier_uses_brackets() {
    let mut fields = tracked("__0__", "__0__");
    if let Some(meta) = fields["__0__"].template_metadata.as_mut() {
        meta.name = "Gross Margin %".into();
    }
    let spec = r#"{"f": "__0__", "c": "datum.__0__ / 100"}"#;
    let restored = detokenize(spec, &fields, &[]);
    assert_eq!(
        restored.spec,
        r#"{"f": "Gross Margin %", "c": "datum['Gross Margin %'] / 100"}"#
    );
}
