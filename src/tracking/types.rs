use crate::field::{encode_field_name, placeholder_index, DatasetField, FieldDataType, FieldKind};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Per-field metadata carried in template `usermeta.dataset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateFieldMetadata {
    /// Placeholder the field is written as in the template.
    pub key: String,
    /// Dataset field name this entry resolves to.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default, rename = "type")]
    pub data_type: FieldDataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_name: Option<String>,
}

impl TemplateFieldMetadata {
    pub fn from_dataset_field(placeholder: &str, field: &DatasetField) -> Self {
        Self {
            key: placeholder.to_string(),
            name: field.name.clone(),
            description: None,
            kind: field.kind,
            data_type: field.data_type,
            query_name: field.query_name.clone(),
        }
    }
}

/// Bookkeeping for one field (or template placeholder).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedFieldProperties {
    pub placeholder: String,
    /// JSONPath of every reference, in document order.
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub is_in_dataset: bool,
    #[serde(default)]
    pub is_in_specification: bool,
    /// Referenced by the spec but no longer resolvable against the dataset.
    /// Only an explicit reassignment clears this.
    #[serde(default)]
    pub is_mapping_required: bool,
    /// Current resolution (user assignment or detected rename).
    #[serde(default)]
    pub template_metadata: Option<TemplateFieldMetadata>,
    /// Metadata as first tracked; the baseline for rename detection.
    #[serde(default)]
    pub template_metadata_original: Option<TemplateFieldMetadata>,
}

impl TrackedFieldProperties {
    pub fn new(placeholder: impl Into<String>) -> Self {
        Self {
            placeholder: placeholder.into(),
            paths: Vec::new(),
            is_in_dataset: false,
            is_in_specification: false,
            is_mapping_required: false,
            template_metadata: None,
            template_metadata_original: None,
        }
    }

    /// Encoded name this entry should be rewritten to, when it differs from `key`.
    pub fn pending_rename(&self, key: &str) -> Option<String> {
        let target = encode_field_name(&self.template_metadata.as_ref()?.name);
        (target != key).then_some(target)
    }
}

/// Tracked fields keyed by field name (or placeholder for imported templates).
pub type TrackedFields = IndexMap<String, TrackedFieldProperties>;

/// The drilldown role, tracked as one pseudo-field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedDrilldownProperties {
    /// The drilldown role currently has columns bound.
    #[serde(default)]
    pub is_current: bool,
    #[serde(default)]
    pub is_mapping_required: bool,
}

/// A field left out of a pass because its patterns did not compile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedField {
    pub field: String,
    pub reason: String,
}

/// Index of the next unused numeric placeholder.
pub fn next_placeholder_index(tracked: &TrackedFields) -> u64 {
    tracked
        .values()
        .filter_map(|props| placeholder_index(&props.placeholder))
        .max()
        .map_or(0, |max| max + 1)
}

/// Keys of entries that need an explicit reassignment.
pub fn fields_requiring_mapping(tracked: &TrackedFields) -> Vec<&str> {
    tracked
        .iter()
        .filter(|(_, props)| props.is_mapping_required)
        .map(|(key, _)| key.as_str())
        .collect()
}

/// Entries whose resolution differs from their key, with the target key.
pub fn pending_renames(tracked: &TrackedFields) -> TrackedFields {
    tracked
        .iter()
        .filter(|(key, props)| props.pending_rename(key).is_some())
        .map(|(key, props)| (key.clone(), props.clone()))
        .collect()
}

/// Re-key renamed entries under their new name once the spec has been
/// rewritten. The renamed entry keeps its placeholder and replaces any entry
/// already tracked under the target name.
pub fn apply_renames(tracked: &TrackedFields) -> TrackedFields {
    let mut out = TrackedFields::new();
    for (key, props) in tracked {
        match props.pending_rename(key) {
            Some(target) => {
                let mut renamed = props.clone();
                renamed.is_mapping_required = false;
                out.insert(target, renamed);
            }
            None => {
                let renamed_into = tracked
                    .iter()
                    .any(|(other, p)| other != key && p.pending_rename(other).as_deref() == Some(key));
                if !renamed_into {
                    out.insert(key.clone(), props.clone());
                }
            }
        }
    }
    out
}
