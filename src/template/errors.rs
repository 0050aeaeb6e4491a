use crate::config::VersionError;
use crate::json::JsonError;
use crate::tracking::SkippedField;
use thiserror::Error;

/// Why a template could not be exported.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("fields require mapping before export: {}", fields.join(", "))]
    MappingRequired { fields: Vec<String> },

    #[error("{} field(s) could not be tokenized", skipped.len())]
    Skipped { skipped: Vec<SkippedField> },

    #[error("specification already has a top-level 'usermeta' property")]
    UsermetaPresent,

    #[error("export is already in progress")]
    InProgress,

    #[error("no export is in progress")]
    NotStarted,

    #[error("failed to serialize template metadata: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Json(#[from] JsonError),

    #[error("failed to insert template metadata: {0}")]
    Edit(#[from] crate::edit::EditError),
}

/// Why a template could not be imported.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template has no top-level 'usermeta' property")]
    MissingUsermeta,

    #[error("invalid template metadata: {0}")]
    InvalidUsermeta(#[from] serde_json::Error),

    #[error("template built with {build} is not supported (requires {supported})")]
    UnsupportedBuild { build: String, supported: String },

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error("'{key}' is not a valid placeholder")]
    InvalidPlaceholder { key: String },

    #[error("placeholder '{key}' appears more than once")]
    DuplicatePlaceholder { key: String },

    #[error(transparent)]
    Json(#[from] JsonError),

    #[error("failed to remove template metadata: {0}")]
    Edit(#[from] crate::edit::EditError),
}
