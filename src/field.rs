//! Dataset field metadata, field-name encoding and placeholder keys.
//!
//! Field names come from the host's data view and may contain characters
//! that the visualization grammar treats as accessor syntax. They are encoded
//! once, on the way in, so every later stage (pattern generation, tracking,
//! tokenizing) sees the same key.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Characters that cannot appear in a field name used by the grammar.
const ILLEGAL_FIELD_CHARS: &[char] = &['\\', '"', '\'', '.', '[', ']'];

/// Encode a raw field name so it is safe to reference from a specification.
///
/// Backslashes, quotes, dots and square brackets become `_`.
pub fn encode_field_name(name: &str) -> String {
    name.chars()
        .map(|c| if ILLEGAL_FIELD_CHARS.contains(&c) { '_' } else { c })
        .collect()
}

/// Placeholder token for a numeric seed: `__<floor(abs(x))>__`.
pub fn placeholder_key(seed: f64) -> String {
    let index = if seed.is_finite() {
        seed.abs().floor() as u64
    } else {
        0
    };
    format!("__{index}__")
}

/// Numeric index of a generated placeholder (`__12__` → 12).
///
/// Returns `None` for tokens that are not purely numeric, such as the
/// drilldown tokens (`__drilldown0__`).
pub fn placeholder_index(token: &str) -> Option<u64> {
    token
        .strip_prefix("__")?
        .strip_suffix("__")
        .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))?
        .parse()
        .ok()
}

/// Whether `token` follows the persisted placeholder grammar.
///
/// This grammar is part of the template format: older templates must keep
/// importing, so it only ever widens.
pub fn is_placeholder(token: &str) -> bool {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER
        .get_or_init(|| Regex::new(r"^__[0-9A-Za-z]+__$").expect("placeholder grammar is valid"))
        .is_match(token)
}

/// Whether `value` can follow `datum.` without brackets.
pub fn is_identifier(value: &str) -> bool {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*$").expect("identifier pattern"))
        .is_match(value)
}

/// How the host exposes a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Column,
    Measure,
    #[default]
    Any,
}

/// Broad data type of a field, as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldDataType {
    Bool,
    Text,
    Numeric,
    DateTime,
    #[default]
    Other,
}

/// Which data role a field is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldRole {
    #[default]
    Standard,
    /// A level of the drilldown hierarchy.
    Drilldown,
}

/// One field of the host dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetField {
    /// Display name, as referenced by the specification.
    pub name: String,
    /// Stable upstream identity; survives display-name changes.
    #[serde(default)]
    pub query_name: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default, rename = "type")]
    pub data_type: FieldDataType,
    #[serde(default)]
    pub role: FieldRole,
}

impl DatasetField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query_name: None,
            kind: FieldKind::default(),
            data_type: FieldDataType::default(),
            role: FieldRole::default(),
        }
    }

    pub fn with_query_name(mut self, query_name: impl Into<String>) -> Self {
        self.query_name = Some(query_name.into());
        self
    }

    pub fn with_kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_type(mut self, data_type: FieldDataType) -> Self {
        self.data_type = data_type;
        self
    }

    pub fn with_role(mut self, role: FieldRole) -> Self {
        self.role = role;
        self
    }

    /// Name after illegal-character encoding.
    pub fn key(&self) -> String {
        encode_field_name(&self.name)
    }
}

/// The host dataset: fields in data-view order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    #[serde(default)]
    pub fields: Vec<DatasetField>,
}

impl Dataset {
    pub fn new(fields: Vec<DatasetField>) -> Self {
        Self { fields }
    }

    /// Fields bound to ordinary roles, in order.
    pub fn standard_fields(&self) -> impl Iterator<Item = &DatasetField> {
        self.fields.iter().filter(|f| f.role == FieldRole::Standard)
    }

    /// Drilldown level columns, in hierarchy order.
    pub fn drilldown_fields(&self) -> impl Iterator<Item = &DatasetField> {
        self.fields.iter().filter(|f| f.role == FieldRole::Drilldown)
    }

    /// Look up a standard field by its encoded key.
    pub fn field(&self, key: &str) -> Option<&DatasetField> {
        self.standard_fields().find(|f| f.key() == key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.field(key).is_some()
    }

    /// Look up a standard field by its upstream query name.
    pub fn field_by_query_name(&self, query_name: &str) -> Option<&DatasetField> {
        self.standard_fields()
            .find(|f| f.query_name.as_deref() == Some(query_name))
    }
}
