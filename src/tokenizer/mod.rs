//! Spec tokenizer and detokenizer.
//!
//! Export replaces every field reference with the field's placeholder; remap
//! (import) runs the same algorithm with roles swapped, searching for
//! placeholders and substituting the assigned field name. Rewriting works on
//! the raw text, so formatting and comments outside the references survive
//! untouched.

pub mod replacer;

pub use replacer::{expand_template, SuffixSource};

use crate::cache;
use crate::field::encode_field_name;
use crate::pattern::{replacement_patterns, PatternError, PatternReplacer};
use crate::tracking::{SkippedField, TrackedFieldProperties, TrackedFields};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::{debug, warn};

/// Rewritten specification plus the fields that could not be processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizeResult {
    pub spec: String,
    #[serde(default)]
    pub skipped: Vec<SkippedField>,
}

/// Search key and replacement for one tracked entry in the given direction.
fn direction<'a>(
    key: &'a str,
    props: &'a TrackedFieldProperties,
    is_remap: bool,
) -> (Cow<'a, str>, Cow<'a, str>) {
    if is_remap {
        let target = props
            .template_metadata
            .as_ref()
            .map_or(Cow::Borrowed(key), |m| Cow::Owned(encode_field_name(&m.name)));
        (Cow::Borrowed(props.placeholder.as_str()), target)
    } else {
        (Cow::Borrowed(key), Cow::Borrowed(props.placeholder.as_str()))
    }
}

struct CompiledReplacer {
    regex: Regex,
    template: String,
}

fn compile(
    field: &str,
    replacers: &[PatternReplacer],
) -> Result<Vec<CompiledReplacer>, PatternError> {
    replacers
        .iter()
        .map(|r| {
            cache::get_or_compile_regex(&r.pattern)
                .map(|regex| CompiledReplacer {
                    regex,
                    template: r.replacer.clone(),
                })
                .map_err(|e| PatternError::Compile {
                    field: field.to_string(),
                    pattern: r.pattern.clone(),
                    message: e.to_string(),
                })
        })
        .collect()
}

fn apply(text: String, replacers: &[CompiledReplacer], source: SuffixSource<'_>) -> String {
    replacers.iter().fold(text, |text, r| {
        let rewritten = match r.regex.replace_all(&text, |caps: &regex::Captures<'_>| {
            expand_template(&r.template, caps, source)
        }) {
            Cow::Owned(rewritten) => Some(rewritten),
            Cow::Borrowed(_) => None,
        };
        rewritten.unwrap_or(text)
    })
}

/// Rewrite `spec` for every tracked field, then apply `supplementary`
/// replacers in order.
///
/// Fields are processed in tracking order, each through its sixteen
/// context patterns in precedence order. A field whose patterns do not
/// compile is left untouched and reported in `skipped`.
pub fn tokenize(
    spec: &str,
    tracked: &TrackedFields,
    supplementary: &[PatternReplacer],
    is_remap: bool,
) -> TokenizeResult {
    let mut text = spec.to_string();
    let mut skipped = Vec::new();

    for (key, props) in tracked {
        let (search, replacement) = direction(key, props, is_remap);
        if search == replacement {
            continue;
        }

        match compile(&search, &replacement_patterns(&search, &replacement)) {
            Ok(compiled) => {
                text = apply(text, &compiled, SuffixSource::SearchKey(&search));
            }
            Err(e) => {
                warn!(field = %key, error = %e, "skipping field during tokenize");
                skipped.push(SkippedField {
                    field: key.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    for replacer in supplementary {
        match compile(&replacer.pattern, std::slice::from_ref(replacer)) {
            Ok(compiled) => text = apply(text, &compiled, SuffixSource::KnownSuffixes),
            Err(e) => {
                warn!(pattern = %replacer.pattern, error = %e, "skipping supplementary replacer");
                skipped.push(SkippedField {
                    field: replacer.pattern.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    debug!(
        fields = tracked.len(),
        supplementary = supplementary.len(),
        skipped = skipped.len(),
        is_remap,
        changed = text != spec,
        "tokenized specification"
    );

    TokenizeResult {
        spec: text,
        skipped,
    }
}

/// Replace every tracked field with its placeholder.
pub fn tokenize_for_export(
    spec: &str,
    tracked: &TrackedFields,
    supplementary: &[PatternReplacer],
) -> TokenizeResult {
    tokenize(spec, tracked, supplementary, false)
}

/// Replace placeholders with the names assigned to them.
pub fn detokenize(
    spec: &str,
    tracked: &TrackedFields,
    supplementary: &[PatternReplacer],
) -> TokenizeResult {
    tokenize(spec, tracked, supplementary, true)
}
