//! Field locator: where each known field is referenced in a specification.
//!
//! The locator never mutates its inputs. It receives a snapshot of the spec
//! text, the dataset and the previously tracked fields, and returns a fresh
//! tracked-field map that the store may adopt.

use crate::field::{encode_field_name, placeholder_key, Dataset};
use crate::json::{string_nodes, StringNode};
use crate::pattern::compile_literal;
use crate::pool::with_parser;
use crate::tracking::drilldown::{drilldown_referenced, resolve_drilldown};
use crate::tracking::types::{
    next_placeholder_index, SkippedField, TemplateFieldMetadata, TrackedDrilldownProperties,
    TrackedFieldProperties, TrackedFields,
};
use regex::Regex;
use tracing::{debug, warn};

/// What the locator scans: the string literals of a parsed spec, or the raw
/// text when the spec does not currently parse.
pub(crate) enum SpecScan<'a> {
    Nodes(Vec<StringNode>),
    RawText(&'a str),
}

impl<'a> SpecScan<'a> {
    pub(crate) fn new(spec: &'a str) -> Self {
        let nodes = with_parser(|parser| {
            let parsed = parser.parse_with_source(spec).ok()?;
            if parsed.has_errors() {
                return None;
            }
            Some(string_nodes(&parsed))
        });

        match nodes {
            Ok(Some(nodes)) => SpecScan::Nodes(nodes),
            Ok(None) => {
                debug!("specification does not parse, falling back to text matching");
                SpecScan::RawText(spec)
            }
            Err(e) => {
                warn!(error = %e, "JSONC parser unavailable, falling back to text matching");
                SpecScan::RawText(spec)
            }
        }
    }

    pub(crate) fn is_fallback(&self) -> bool {
        matches!(self, SpecScan::RawText(_))
    }

    /// Whether any pattern matches anywhere in the spec.
    pub(crate) fn any_match(&self, patterns: &[Regex]) -> bool {
        match self {
            SpecScan::Nodes(nodes) => nodes
                .iter()
                .any(|node| patterns.iter().any(|re| re.is_match(&node.raw))),
            SpecScan::RawText(text) => patterns.iter().any(|re| re.is_match(text)),
        }
    }

    /// JSONPaths of the string literals that match, deduplicated, in
    /// document order. Always empty for the text fallback.
    fn matching_paths(&self, patterns: &[Regex]) -> Vec<String> {
        let SpecScan::Nodes(nodes) = self else {
            return Vec::new();
        };
        let mut paths: Vec<String> = Vec::new();
        for node in nodes {
            if patterns.iter().any(|re| re.is_match(&node.raw)) && !paths.contains(&node.path) {
                paths.push(node.path.clone());
            }
        }
        paths
    }
}

/// Result of one locator run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorResult {
    pub tracked_fields: TrackedFields,
    pub tracked_drilldown: TrackedDrilldownProperties,
    pub skipped: Vec<SkippedField>,
    /// The spec did not parse; paths were carried over from the previous run.
    pub used_text_fallback: bool,
}

/// Locates field references in a specification.
///
/// With `reset`, previous flags are ignored and every entry is recomputed
/// from scratch (placeholders and template metadata are still carried over).
pub struct FieldLocator<'a> {
    dataset: &'a Dataset,
    current: &'a TrackedFields,
    current_drilldown: TrackedDrilldownProperties,
    reset: bool,
}

impl<'a> FieldLocator<'a> {
    pub fn new(dataset: &'a Dataset, current: &'a TrackedFields) -> Self {
        Self {
            dataset,
            current,
            current_drilldown: TrackedDrilldownProperties::default(),
            reset: false,
        }
    }

    pub fn with_drilldown(mut self, drilldown: TrackedDrilldownProperties) -> Self {
        self.current_drilldown = drilldown;
        self
    }

    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }

    /// Dataset keys first (in data-view order), then previously tracked keys.
    fn candidate_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.dataset.standard_fields().map(|f| f.key()).collect();
        for key in self.current.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys
    }

    pub fn locate(&self, spec: &str) -> LocatorResult {
        let scan = SpecScan::new(spec);
        let mut tracked = TrackedFields::new();
        let mut skipped = Vec::new();
        let mut next_index = next_placeholder_index(self.current);

        for key in self.candidate_keys() {
            let prior = self.current.get(&key);
            let patterns = match compile_literal(&key) {
                Ok(patterns) => patterns,
                Err(e) => {
                    warn!(field = %key, error = %e, "skipping field with invalid pattern");
                    skipped.push(SkippedField {
                        field: key.clone(),
                        reason: e.to_string(),
                    });
                    if let Some(prior) = prior {
                        tracked.insert(key, prior.clone());
                    }
                    continue;
                }
            };

            if let Some(props) = self.track(&key, prior, &scan, &patterns, &mut next_index) {
                tracked.insert(key, props);
            }
        }

        let drilldown = resolve_drilldown(
            self.dataset,
            drilldown_referenced(&scan),
            self.current_drilldown,
            self.reset,
        );

        debug!(
            fields = tracked.len(),
            mapping_required = tracked.values().filter(|p| p.is_mapping_required).count(),
            skipped = skipped.len(),
            fallback = scan.is_fallback(),
            "located field references"
        );

        LocatorResult {
            tracked_fields: tracked,
            tracked_drilldown: drilldown,
            skipped,
            used_text_fallback: scan.is_fallback(),
        }
    }

    fn track(
        &self,
        key: &str,
        prior: Option<&TrackedFieldProperties>,
        scan: &SpecScan<'_>,
        patterns: &[Regex],
        next_index: &mut u64,
    ) -> Option<TrackedFieldProperties> {
        let in_spec = scan.any_match(patterns);
        let dataset_field = self.dataset.field(key);
        let in_dataset = dataset_field.is_some();

        // Nothing is left to map once the spec stops referencing the field,
        // so even a flagged entry goes.
        if !in_spec && !in_dataset {
            return None;
        }

        let placeholder = match prior {
            Some(prior) => prior.placeholder.clone(),
            None => {
                let placeholder = placeholder_key(*next_index as f64);
                *next_index += 1;
                placeholder
            }
        };

        let mut paths = scan.matching_paths(patterns);
        if scan.is_fallback() && in_spec {
            paths = prior.map(|p| p.paths.clone()).unwrap_or_default();
        }

        let original = prior
            .and_then(|p| p.template_metadata_original.clone())
            .or_else(|| {
                dataset_field.map(|f| TemplateFieldMetadata::from_dataset_field(&placeholder, f))
            });

        let renamed_to = if in_dataset {
            None
        } else {
            original
                .as_ref()
                .and_then(|o| o.query_name.as_deref())
                .and_then(|q| self.dataset.field_by_query_name(q))
                .filter(|f| f.key() != key)
        };

        let metadata = match (dataset_field, renamed_to) {
            (Some(field), _) => Some(TemplateFieldMetadata::from_dataset_field(&placeholder, field)),
            (None, Some(target)) => {
                debug!(field = %key, renamed_to = %target.name, "detected upstream rename");
                Some(TemplateFieldMetadata::from_dataset_field(&placeholder, target))
            }
            (None, None) => prior.and_then(|p| p.template_metadata.clone()),
        };

        let assigned = metadata
            .as_ref()
            .is_some_and(|m| self.dataset.contains(&encode_field_name(&m.name)));

        let is_mapping_required = if in_dataset || assigned || !in_spec {
            false
        } else if self.reset {
            true
        } else {
            prior.is_some_and(|p| p.is_mapping_required || p.is_in_specification)
        };

        if is_mapping_required && paths.is_empty() {
            if let Some(prior) = prior {
                paths = prior.paths.clone();
            }
        }

        Some(TrackedFieldProperties {
            placeholder,
            paths,
            is_in_dataset: in_dataset,
            is_in_specification: in_spec,
            is_mapping_required,
            template_metadata: metadata,
            template_metadata_original: original,
        })
    }
}

/// Convenience wrapper: locate with an incremental (non-reset) run.
pub fn locate_fields(spec: &str, dataset: &Dataset, current: &TrackedFields) -> LocatorResult {
    FieldLocator::new(dataset, current).locate(spec)
}
