//! Drilldown pseudo-field.
//!
//! The number of drilldown levels bound to a visual is only known at render
//! time, so the role is tracked as a single entry instead of one entry per
//! column. Level columns are still rewritten on export, positionally, through
//! supplementary replacers.

use crate::cache;
use crate::field::Dataset;
use crate::pattern::{compile_literal, replacement_patterns, PatternReplacer};
use crate::tracking::locator::SpecScan;
use crate::tracking::types::TrackedDrilldownProperties;
use regex::Regex;
use tracing::warn;

/// Array of drilldown level values exposed to the specification.
pub const DRILLDOWN_FIELD: &str = "__drilldown";
/// Level values joined into a single string.
pub const DRILLDOWN_FLAT_FIELD: &str = "__drilldown_flat";

/// Matches positional level tokens left behind by an export.
const LEVEL_TOKEN_PATTERN: &str = r"__drilldown\d+__";

/// Token a drilldown level column is exported as.
pub fn drilldown_level_token(level: usize) -> String {
    format!("__drilldown{level}__")
}

fn drilldown_patterns() -> Vec<Regex> {
    let mut patterns = Vec::new();
    for name in [DRILLDOWN_FIELD, DRILLDOWN_FLAT_FIELD] {
        match compile_literal(name) {
            Ok(compiled) => patterns.extend(compiled),
            Err(e) => warn!(error = %e, "drilldown pattern failed to compile"),
        }
    }
    match cache::get_or_compile_regex(LEVEL_TOKEN_PATTERN) {
        Ok(re) => patterns.push(re),
        Err(e) => warn!(error = %e, "drilldown level pattern failed to compile"),
    }
    patterns
}

/// Whether the specification references the drilldown role at all.
pub(crate) fn drilldown_referenced(scan: &SpecScan<'_>) -> bool {
    scan.any_match(&drilldown_patterns())
}

/// Reconcile drilldown tracking against the dataset.
///
/// Mapping becomes required when a spec that references drilldown loses the
/// columns previously bound to the role; like field mappings, the flag stays
/// until drilldown columns are bound again.
pub fn resolve_drilldown(
    dataset: &Dataset,
    referenced: bool,
    prior: TrackedDrilldownProperties,
    reset: bool,
) -> TrackedDrilldownProperties {
    let is_current = dataset.drilldown_fields().next().is_some();
    let is_mapping_required = if is_current || !referenced {
        false
    } else if reset {
        true
    } else {
        prior.is_mapping_required || prior.is_current
    };

    TrackedDrilldownProperties {
        is_current,
        is_mapping_required,
    }
}

/// Whether `spec` still carries positional level tokens from an export.
pub fn contains_level_tokens(spec: &str) -> bool {
    match cache::get_or_compile_regex(LEVEL_TOKEN_PATTERN) {
        Ok(re) => re.is_match(spec),
        Err(e) => {
            warn!(error = %e, "drilldown level pattern failed to compile");
            false
        }
    }
}

/// Replacers that swap drilldown level columns for positional tokens
/// (`__drilldown0__`, ...) or, when `is_remap`, back again.
pub fn drilldown_replacers(dataset: &Dataset, is_remap: bool) -> Vec<PatternReplacer> {
    dataset
        .drilldown_fields()
        .enumerate()
        .flat_map(|(level, field)| {
            let token = drilldown_level_token(level);
            let key = field.key();
            if is_remap {
                replacement_patterns(&token, &key)
            } else {
                replacement_patterns(&key, &token)
            }
        })
        .collect()
}
