//! Request and response payloads exchanged with the background workers.
//!
//! Every request is a complete snapshot; workers keep nothing between jobs.

use crate::field::Dataset;
use crate::pattern::PatternReplacer;
use crate::tokenizer::TokenizeResult;
use crate::tracking::{SkippedField, TrackedDrilldownProperties, TrackedFields};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsInUseRequest {
    pub spec: String,
    pub dataset: Dataset,
    pub tracked_fields_current: TrackedFields,
    #[serde(default)]
    pub tracked_drilldown_current: TrackedDrilldownProperties,
    /// Recompute every entry instead of reconciling with the current set.
    #[serde(default)]
    pub reset: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsInUseResponse {
    pub tracked_fields: TrackedFields,
    pub tracked_drilldown: TrackedDrilldownProperties,
    #[serde(default)]
    pub skipped: Vec<SkippedField>,
}

impl FieldsInUseResponse {
    /// Response that leaves tracking exactly as the request found it.
    pub fn unchanged(request: &FieldsInUseRequest) -> Self {
        Self {
            tracked_fields: request.tracked_fields_current.clone(),
            tracked_drilldown: request.tracked_drilldown_current,
            skipped: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenizerRequest {
    pub spec: String,
    pub tracked_fields: TrackedFields,
    #[serde(default)]
    pub supplementary_replacers: Vec<PatternReplacer>,
    /// Search placeholders and substitute assigned names.
    #[serde(default)]
    pub is_remap: bool,
}

pub type TokenizerResponse = TokenizeResult;

/// Response that hands the spec back untouched, reporting every field (and
/// supplementary pattern) as skipped so callers never mistake it for a
/// completed rewrite.
pub fn unchanged_spec(request: &TokenizerRequest, reason: &str) -> TokenizerResponse {
    let skipped = request
        .tracked_fields
        .keys()
        .cloned()
        .chain(request.supplementary_replacers.iter().map(|r| r.pattern.clone()))
        .map(|field| SkippedField {
            field,
            reason: reason.to_string(),
        })
        .collect();
    TokenizeResult {
        spec: request.spec.clone(),
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_flags_default_to_false() {
        let request: FieldsInUseRequest = serde_json::from_str(
            r#"{"spec": "{}", "dataset": {"fields": []}, "trackedFieldsCurrent": {}}"#,
        )
        .unwrap();
        assert!(!request.reset);
        assert_eq!(request.tracked_drilldown_current, TrackedDrilldownProperties::default());

        let request: TokenizerRequest =
            serde_json::from_str(r#"{"spec": "{}", "trackedFields": {}}"#).unwrap();
        assert!(!request.is_remap);
        assert!(request.supplementary_replacers.is_empty());
    }

    #[test]
    fn unchanged_spec_reports_everything_skipped() {
        let mut tracked = TrackedFields::new();
        tracked.insert(
            "Sales".into(),
            crate::tracking::TrackedFieldProperties::new("__0__"),
        );
        let request = TokenizerRequest {
            spec: r#"{"f": "Sales"}"#.into(),
            tracked_fields: tracked,
            supplementary_replacers: vec![PatternReplacer::new("(x)", "y")],
            is_remap: false,
        };
        let response = unchanged_spec(&request, "timed out");
        assert_eq!(response.spec, request.spec);
        let skipped: Vec<_> = response.skipped.iter().map(|s| s.field.as_str()).collect();
        assert_eq!(skipped, vec!["Sales", "(x)"]);
    }

    #[test]
    fn responses_use_camel_case() {
        let json = serde_json::to_value(FieldsInUseResponse::default()).unwrap();
        assert!(json.get("trackedFields").is_some());
        assert!(json.get("trackedDrilldown").is_some());
    }
}
