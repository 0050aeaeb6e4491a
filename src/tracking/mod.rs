//! Field tracking: which dataset fields a specification references, where,
//! and whether each reference still resolves.

pub mod drilldown;
pub mod locator;
pub mod suggest;
pub mod types;

pub use drilldown::{
    contains_level_tokens, drilldown_level_token, drilldown_replacers, resolve_drilldown,
    DRILLDOWN_FIELD, DRILLDOWN_FLAT_FIELD,
};
pub use locator::{locate_fields, FieldLocator, LocatorResult};
pub use suggest::{suggest_mappings, MappingCandidate, MappingSuggestion};
pub use types::{
    apply_renames, fields_requiring_mapping, next_placeholder_index, pending_renames,
    SkippedField, TemplateFieldMetadata, TrackedDrilldownProperties, TrackedFieldProperties, TrackedFields,
};
