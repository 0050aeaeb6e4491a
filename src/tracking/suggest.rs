//! Candidate reassignments for fields that require mapping.

use crate::field::{Dataset, DatasetField};
use crate::tracking::types::{TrackedFieldProperties, TrackedFields};
use serde::Serialize;

/// Bonus added when a candidate has the same kind as the original field.
const KIND_BONUS: f64 = 0.15;
/// Bonus added when a candidate has the same data type.
const TYPE_BONUS: f64 = 0.1;

/// One ranked candidate for a field that requires mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingCandidate {
    pub name: String,
    pub score: f64,
}

/// Ranked candidates for one tracked entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingSuggestion {
    pub key: String,
    pub candidates: Vec<MappingCandidate>,
}

fn reference_name<'a>(key: &'a str, props: &'a TrackedFieldProperties) -> &'a str {
    props
        .template_metadata_original
        .as_ref()
        .or(props.template_metadata.as_ref())
        .map_or(key, |m| m.name.as_str())
}

fn score(name: &str, props: &TrackedFieldProperties, candidate: &DatasetField) -> f64 {
    let mut score = strsim::normalized_levenshtein(
        &name.to_lowercase(),
        &candidate.name.to_lowercase(),
    );
    if let Some(original) = props.template_metadata_original.as_ref() {
        if original.kind == candidate.kind {
            score += KIND_BONUS;
        }
        if original.data_type == candidate.data_type {
            score += TYPE_BONUS;
        }
    }
    score
}

/// Rank dataset fields as replacements for every entry requiring mapping.
///
/// At most `limit` candidates per entry, best first.
pub fn suggest_mappings(
    tracked: &TrackedFields,
    dataset: &Dataset,
    limit: usize,
) -> Vec<MappingSuggestion> {
    tracked
        .iter()
        .filter(|(_, props)| props.is_mapping_required)
        .map(|(key, props)| {
            let name = reference_name(key, props);
            let mut candidates: Vec<MappingCandidate> = dataset
                .standard_fields()
                .map(|field| MappingCandidate {
                    name: field.name.clone(),
                    score: score(name, props, field),
                })
                .collect();
            candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
            candidates.truncate(limit);
            MappingSuggestion {
                key: key.clone(),
                candidates,
            }
        })
        .collect()
}
